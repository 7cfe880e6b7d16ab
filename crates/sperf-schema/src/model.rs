//! # Model Assembler
//!
//! Walks a schema document's root and every definition, classifies each,
//! and collects the results into a closed [`Model`]: one descriptor, object
//! shape, or object reference per top-level schema. Named references
//! between entries resolve through the model itself, which implements
//! [`ObjectLookup`].
//!
//! Any structural error aborts assembly. No partial model is returned.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sperf_core::{ModelConfig, SchemaError, SperfError, ValidationError};
use sperf_validate::{InstanceType, ObjectDefinition, ObjectLookup, ObjectRef, Validator};
use tracing::{debug, info};

use crate::classify::{Category, Classifier, Outcome};
use crate::node::{NodeId, SchemaArena};

/// Upper bound on definition-to-definition aliasing followed by a lookup.
const MAX_ALIAS_DEPTH: usize = 16;

/// One classified top-level schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Class name (`Root` for the root, the regularized definition name otherwise).
    pub name: String,
    /// Class name qualified with the configured module.
    pub qualified_name: String,
    /// Canonical digest of the raw fragment (`sha256:<hex>`).
    pub schema_hash: String,
    /// The category the classifier assigned.
    pub category: Category,
    /// The descriptor or shape built for it.
    pub outcome: Outcome,
}

/// The classified root schema and its definitions, in document order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// The root schema.
    pub root: ModelEntry,
    /// Every definition of the root, across all definition tags.
    pub definitions: Vec<ModelEntry>,
}

impl Model {
    /// Resolve and classify a schema document.
    pub fn build(schema: Value, config: ModelConfig) -> Result<Self, SperfError> {
        let mut arena = SchemaArena::new(config);
        let root = arena.add_root(schema)?;
        let definition_nodes = arena.all_definitions(root)?;

        let mut classifier = Classifier::new(arena);
        let root_entry = entry(&mut classifier, root)?;
        let definitions = definition_nodes
            .into_iter()
            .map(|(_, id)| entry(&mut classifier, id))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            root = %root_entry.name,
            root_category = ?root_entry.category,
            definitions = definitions.len(),
            nodes = classifier.arena().len(),
            "assembled schema model"
        );
        Ok(Self {
            root: root_entry,
            definitions,
        })
    }

    /// The definition named `name`.
    pub fn definition(&self, name: &str) -> Option<&ModelEntry> {
        self.definitions.iter().find(|e| e.name == name)
    }

    /// Definition names, in document order.
    pub fn definition_names(&self) -> Vec<&str> {
        self.definitions.iter().map(|e| e.name.as_str()).collect()
    }

    /// Root first, then definitions.
    pub fn entries(&self) -> impl Iterator<Item = &ModelEntry> {
        std::iter::once(&self.root).chain(self.definitions.iter())
    }

    fn entry(&self, name: &str) -> Option<&ModelEntry> {
        self.entries().find(|e| e.name == name)
    }

    /// Validate a document against the root schema.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.validate_entry(&self.root, value)
    }

    /// Validate a value against a named definition.
    pub fn validate_definition(&self, name: &str, value: &Value) -> Result<(), SperfError> {
        let entry = self.definition(name).ok_or_else(|| SchemaError::UnresolvedReference {
            reference: format!("#/definitions/{name}"),
            segment: name.to_string(),
        })?;
        Ok(self.validate_entry(entry, value)?)
    }

    fn validate_entry(&self, entry: &ModelEntry, value: &Value) -> Result<(), ValidationError> {
        match &entry.outcome {
            Outcome::Trait(v) => v.validate_in(value, self),
            Outcome::Object(def) => def.validate_in(value, self),
            Outcome::Reference(r) => {
                Validator::instance_of(InstanceType::Object(r.clone())).validate_in(value, self)
            }
        }
    }
}

impl ObjectLookup for Model {
    fn lookup_object(&self, name: &str) -> Option<&ObjectDefinition> {
        let mut name = name;
        for _ in 0..MAX_ALIAS_DEPTH {
            match &self.entry(name)?.outcome {
                Outcome::Object(def) => return Some(def),
                Outcome::Reference(ObjectRef::Inline(def)) => return Some(def),
                Outcome::Reference(ObjectRef::Named(next)) => name = next,
                Outcome::Trait(_) => return None,
            }
        }
        None
    }
}

fn entry(classifier: &mut Classifier, id: NodeId) -> Result<ModelEntry, SperfError> {
    let arena = classifier.arena();
    let name = arena.inline_name(id);
    let qualified_name = arena.full_classname(id).unwrap_or_else(|| name.clone());
    let schema_hash = arena.schema_hash(id)?.to_string();

    let classification = classifier.classify(id)?;
    debug!(name = %name, category = ?classification.category, "assembled model entry");
    Ok(ModelEntry {
        name,
        qualified_name,
        schema_hash,
        category: classification.category,
        outcome: classification.outcome,
    })
}
