//! # Named Object Definitions
//!
//! The shape generated for an object-like schema node: a name, a base-class
//! marker, an ordered property list, and an additional-properties policy.
//! Composed shapes (`anyOf`/`oneOf`/`allOf` over object branches) also keep
//! their branch list so the composition can be enforced and rendered.
//!
//! ## Validation
//!
//! [`ObjectDefinition::validate_in`] first checks that the value is a JSON
//! object. A plain shape then checks each declared property, passing
//! `Undefined` when the key is absent so the property's `allow_undefined`
//! flag enforces `required`, and each undeclared key against the
//! additional-properties policy.
//!
//! An `allOf` shape is the merge of its branches, so the member checks
//! enforce it. Branches that could not be merged (a recursive reference to
//! a definition still being built) are validated one by one.
//!
//! An `anyOf`/`oneOf` shape validates the node's own declarations, then
//! requires at least one / exactly one branch to accept the whole value.
//! Its merged property list is for emitters only: a property constrained by
//! one branch says nothing about values another branch accepts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sperf_core::pointer;
use sperf_core::ValidationError;

use crate::descriptor::Validator;
use crate::instance::{json_type_name, render_value, Instance};

/// A property of a named object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    /// Regularized identifier.
    pub name: String,
    /// Key as written in the schema and in instances.
    pub json_name: String,
    /// Whether the property is listed in `required`.
    pub required: bool,
    /// Descriptor for the property value. Object-valued properties use
    /// `InstanceOf(Object(..))`.
    pub validator: Validator,
}

/// Policy for keys not declared in `properties`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "validator", rename_all = "snake_case")]
pub enum AdditionalProperties {
    /// `additionalProperties: false`.
    Reject,
    /// `additionalProperties: true` (the default).
    #[default]
    AcceptAny,
    /// `additionalProperties: {schema}`.
    Validate(Box<Validator>),
}

impl AdditionalProperties {
    /// Restrictiveness rank: reject > validate > accept-any.
    pub fn rank(&self) -> u8 {
        match self {
            Self::AcceptAny => 0,
            Self::Validate(_) => 1,
            Self::Reject => 2,
        }
    }
}

/// The composition keyword of a composed object shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompositionKind {
    /// `anyOf`.
    AnyOf,
    /// `oneOf`.
    OneOf,
    /// `allOf`.
    AllOf,
}

impl CompositionKind {
    /// The JSON Schema keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
            Self::AllOf => "allOf",
        }
    }
}

impl std::fmt::Display for CompositionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Branch list of a composed object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectComposition {
    /// The composition keyword.
    pub kind: CompositionKind,
    /// One shape per branch, in schema order.
    pub branches: Vec<ObjectRef>,
    /// Properties and policy declared next to the keyword.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub own: Option<Box<ObjectDefinition>>,
    /// Indices of branches missing from the merged property list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unmerged: Vec<usize>,
}

/// A reference to an object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "ref", content = "target", rename_all = "snake_case")]
pub enum ObjectRef {
    /// A top-level named definition, resolved through an [`ObjectLookup`].
    Named(String),
    /// An anonymous shape owned by its user.
    Inline(Box<ObjectDefinition>),
}

impl ObjectRef {
    /// The referenced class name.
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Inline(def) => &def.name,
        }
    }

    /// Resolve to a definition. Named references need the lookup.
    pub fn resolve<'a>(&'a self, lookup: &'a dyn ObjectLookup) -> Option<&'a ObjectDefinition> {
        match self {
            Self::Named(name) => lookup.lookup_object(name),
            Self::Inline(def) => Some(def),
        }
    }
}

/// Resolves named object references during validation.
pub trait ObjectLookup {
    /// The definition registered under `name`, if any.
    fn lookup_object(&self, name: &str) -> Option<&ObjectDefinition>;
}

/// A lookup that knows no names. Named references degrade to a type check.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLookup;

impl ObjectLookup for NoLookup {
    fn lookup_object(&self, _name: &str) -> Option<&ObjectDefinition> {
        None
    }
}

/// The generated shape for an object-like schema node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDefinition {
    /// Regularized class name.
    pub name: String,
    /// Base-class marker.
    pub base_class: String,
    /// Schema `description`, empty when absent.
    #[serde(default)]
    pub description: String,
    /// Properties in schema order.
    pub properties: Vec<Property>,
    /// Policy for undeclared keys.
    pub additional_properties: AdditionalProperties,
    /// Branches of a composed shape.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<ObjectComposition>,
}

impl ObjectDefinition {
    /// An empty shape that accepts any keys.
    pub fn new(name: impl Into<String>, base_class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_class: base_class.into(),
            description: String::new(),
            properties: Vec::new(),
            additional_properties: AdditionalProperties::AcceptAny,
            composition: None,
        }
    }

    /// Builder: append a property.
    pub fn with_property(mut self, json_name: &str, required: bool, validator: Validator) -> Self {
        self.properties.push(Property {
            name: sperf_core::regularize_name(json_name),
            json_name: json_name.to_string(),
            required,
            validator: validator.with_allow_undefined(!required),
        });
        self
    }

    /// Builder: set the additional-properties policy.
    pub fn with_additional(mut self, policy: AdditionalProperties) -> Self {
        self.additional_properties = policy;
        self
    }

    /// Look up a property by its JSON key.
    pub fn property(&self, json_name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.json_name == json_name)
    }

    /// JSON keys of the declared properties, in order.
    pub fn property_names(&self) -> Vec<&str> {
        self.properties.iter().map(|p| p.json_name.as_str()).collect()
    }

    /// Validate without resolving named references.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        self.validate_in(value, &NoLookup)
    }

    /// Validate, resolving named references through `lookup`.
    pub fn validate_in(&self, value: &Value, lookup: &dyn ObjectLookup) -> Result<(), ValidationError> {
        self.validate_at(value, "", lookup)
    }

    pub(crate) fn validate_at(
        &self,
        value: &Value,
        path: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        let Some(map) = value.as_object() else {
            return Err(ValidationError::TypeMismatch {
                path: path.to_string(),
                expected: format!("object ({})", self.name),
                found: json_type_name(value).to_string(),
            });
        };

        match &self.composition {
            Some(composition) if composition.kind != CompositionKind::AllOf => {
                composition.validate_at(value, path, lookup)
            }
            Some(composition) => {
                self.validate_members(map, path, lookup)?;
                composition.validate_unmerged(value, path, lookup)
            }
            None => self.validate_members(map, path, lookup),
        }
    }

    fn validate_members(
        &self,
        map: &serde_json::Map<String, Value>,
        path: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        for prop in &self.properties {
            let child = pointer::push(path, &prop.json_name);
            prop.validator
                .validate_at(Instance::from(map.get(&prop.json_name)), &child, lookup)?;
        }

        for (key, item) in map {
            if self.property(key).is_some() {
                continue;
            }
            match &self.additional_properties {
                AdditionalProperties::AcceptAny => {}
                AdditionalProperties::Reject => {
                    return Err(ValidationError::ConstraintViolation {
                        path: pointer::push(path, key),
                        keyword: "additionalProperties".to_string(),
                        value: render_value(item),
                        reason: format!("'{key}' is not a declared property of {}", self.name),
                    });
                }
                AdditionalProperties::Validate(validator) => {
                    validator.validate_at(Instance::Defined(item), &pointer::push(path, key), lookup)?;
                }
            }
        }
        Ok(())
    }
}

impl ObjectComposition {
    /// A composition with every branch merged and no own declarations.
    pub fn new(kind: CompositionKind, branches: Vec<ObjectRef>) -> Self {
        Self {
            kind,
            branches,
            own: None,
            unmerged: Vec::new(),
        }
    }

    fn validate_unmerged(
        &self,
        value: &Value,
        path: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        for &i in &self.unmerged {
            if let Some(def) = self.branches.get(i).and_then(|b| b.resolve(lookup)) {
                def.validate_at(value, path, lookup)?;
            }
        }
        Ok(())
    }

    fn validate_at(
        &self,
        value: &Value,
        path: &str,
        lookup: &dyn ObjectLookup,
    ) -> Result<(), ValidationError> {
        if let Some(own) = &self.own {
            own.validate_at(value, path, lookup)?;
        }
        let mut matched = Vec::new();
        let mut failures = Vec::new();
        for (i, branch) in self.branches.iter().enumerate() {
            let result = match branch.resolve(lookup) {
                Some(def) => def.validate_at(value, path, lookup),
                // Unresolvable named branch: the object type check already passed.
                None => Ok(()),
            };
            match result {
                Ok(()) => matched.push(i),
                Err(e) => failures.push(format!("[{i}] {e}")),
            }
        }

        let reason = match (self.kind, matched.len()) {
            (CompositionKind::OneOf, 1) => return Ok(()),
            (CompositionKind::AnyOf, n) if n > 0 => return Ok(()),
            (_, 0) => format!("no branch matched: {}", failures.join("; ")),
            (_, _) => format!("branches {matched:?} all matched"),
        };
        Err(ValidationError::ConstraintViolation {
            path: path.to_string(),
            keyword: self.kind.keyword().to_string(),
            value: render_value(value),
            reason,
        })
    }
}
