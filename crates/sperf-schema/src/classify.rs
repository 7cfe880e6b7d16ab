//! # Classifier — the Extractor Chain
//!
//! Given a schema node, decide which [`Category`] governs it and build the
//! validator descriptor or object shape that category implies.
//!
//! ## Design
//!
//! Classification is first-match-wins over [`RULES`], a fixed table of
//! matcher/builder pairs. The order is part of the contract and is exported
//! as [`CLASSIFICATION_ORDER`]:
//!
//! | # | Category | Matches when |
//! |---|---|---|
//! | 1-3 | `AnyOfObject`, `OneOfObject`, `AllOfObject` | the keyword is present and every branch is object-like |
//! | 4 | `RefObject` | `$ref` whose target is object-like |
//! | 5 | `RefTrait` | any other `$ref` |
//! | 6 | `Not` | `not` |
//! | 7-9 | `AnyOf`, `AllOf`, `OneOf` | the keyword is present |
//! | 10 | `Enum` | `enum` |
//! | 11 | `SimpleType` | `type` is one primitive name |
//! | 12 | `CompoundType` | `type` is a list of type names |
//! | 13 | `Array` | `type` is `array` |
//! | 14 | `Object` | `type` is `object` (the default) |
//!
//! No match is `SchemaError::UnrecognizedSchema`.
//!
//! ## Object-like and trait-like
//!
//! Both are recursive predicates over `properties`, `$ref`, and the
//! composition keywords; branches are ANDed. Results are memoized by
//! [`Origin`] and the walk is guarded, so a schema that reaches itself
//! through `$ref`/`allOf` without ever declaring `properties` fails with
//! `SchemaError::CyclicReference` instead of recursing forever.
//! Classification itself is guarded the same way.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sperf_core::{regularize_name, MergePolicy, SchemaError};
use sperf_validate::{
    AdditionalProperties, ArrayConstraints, CompositionKind, InstanceType, Items,
    ObjectComposition, ObjectDefinition, ObjectRef, Property, Validator, ValidatorKind,
};
use tracing::{debug, warn};

use crate::keywords::{AdditionalDecl, ItemsDecl, TypeDecl, PRIMITIVE_TYPES};
use crate::node::{NodeId, NodeMetadata, Origin, SchemaArena};
use crate::resolver::ResolutionGuard;

/// The semantic category of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    /// `anyOf` over object-like branches.
    AnyOfObject,
    /// `oneOf` over object-like branches.
    OneOfObject,
    /// `allOf` over object-like branches.
    AllOfObject,
    /// `$ref` to an object-like target.
    RefObject,
    /// `$ref` to anything else.
    RefTrait,
    /// `not`.
    Not,
    /// `anyOf` over trait-like or mixed branches.
    AnyOf,
    /// `allOf` over trait-like or mixed branches.
    AllOf,
    /// `oneOf` over trait-like or mixed branches.
    OneOf,
    /// `enum`.
    Enum,
    /// A single primitive `type`.
    SimpleType,
    /// A list of type names.
    CompoundType,
    /// `type: array`.
    Array,
    /// `type: object`, explicit or defaulted.
    Object,
}

/// The order in which categories are tried.
pub const CLASSIFICATION_ORDER: [Category; 14] = [
    Category::AnyOfObject,
    Category::OneOfObject,
    Category::AllOfObject,
    Category::RefObject,
    Category::RefTrait,
    Category::Not,
    Category::AnyOf,
    Category::AllOf,
    Category::OneOf,
    Category::Enum,
    Category::SimpleType,
    Category::CompoundType,
    Category::Array,
    Category::Object,
];

/// What a category builds for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "shape", rename_all = "snake_case")]
pub enum Outcome {
    /// A single validator descriptor.
    Trait(Validator),
    /// A generated object shape.
    Object(ObjectDefinition),
    /// A reference to an object shape generated elsewhere.
    Reference(ObjectRef),
}

impl Outcome {
    /// The descriptor to use where this node is the value of a property,
    /// an array item, or a branch.
    pub fn into_validator(self) -> Validator {
        match self {
            Self::Trait(v) => v,
            Self::Object(def) => {
                Validator::instance_of(InstanceType::Object(ObjectRef::Inline(Box::new(def))))
            }
            Self::Reference(r) => Validator::instance_of(InstanceType::Object(r)),
        }
    }

    /// The object shape, for `Object` outcomes.
    pub fn as_object(&self) -> Option<&ObjectDefinition> {
        match self {
            Self::Object(def) => Some(def),
            _ => None,
        }
    }
}

/// The category of a node and what it built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The first matching category.
    pub category: Category,
    /// The descriptor or shape.
    pub outcome: Outcome,
}

type Matcher = fn(&mut Classifier, NodeId) -> Result<bool, SchemaError>;
type Builder = fn(&mut Classifier, NodeId) -> Result<Outcome, SchemaError>;

/// One entry of the extractor chain.
pub struct Rule {
    /// The category this rule assigns.
    pub category: Category,
    matches: Matcher,
    build: Builder,
}

/// The extractor chain, in priority order.
pub static RULES: &[Rule] = &[
    Rule {
        category: Category::AnyOfObject,
        matches: Classifier::matches_any_of_object,
        build: Classifier::build_any_of_object,
    },
    Rule {
        category: Category::OneOfObject,
        matches: Classifier::matches_one_of_object,
        build: Classifier::build_one_of_object,
    },
    Rule {
        category: Category::AllOfObject,
        matches: Classifier::matches_all_of_object,
        build: Classifier::build_all_of_object,
    },
    Rule {
        category: Category::RefObject,
        matches: Classifier::matches_ref_object,
        build: Classifier::build_ref_object,
    },
    Rule {
        category: Category::RefTrait,
        matches: Classifier::matches_ref_trait,
        build: Classifier::build_ref_trait,
    },
    Rule {
        category: Category::Not,
        matches: Classifier::matches_not,
        build: Classifier::build_not,
    },
    Rule {
        category: Category::AnyOf,
        matches: Classifier::matches_any_of,
        build: Classifier::build_any_of,
    },
    Rule {
        category: Category::AllOf,
        matches: Classifier::matches_all_of,
        build: Classifier::build_all_of,
    },
    Rule {
        category: Category::OneOf,
        matches: Classifier::matches_one_of,
        build: Classifier::build_one_of,
    },
    Rule {
        category: Category::Enum,
        matches: Classifier::matches_enum,
        build: Classifier::build_enum,
    },
    Rule {
        category: Category::SimpleType,
        matches: Classifier::matches_simple_type,
        build: Classifier::build_simple_type,
    },
    Rule {
        category: Category::CompoundType,
        matches: Classifier::matches_compound_type,
        build: Classifier::build_compound_type,
    },
    Rule {
        category: Category::Array,
        matches: Classifier::matches_array,
        build: Classifier::build_array,
    },
    Rule {
        category: Category::Object,
        matches: Classifier::matches_object,
        build: Classifier::build_object,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Predicate {
    ObjectLike,
    TraitLike,
}

/// Classifies nodes of one arena.
///
/// Owns the arena for the duration of a pass, since following `$ref` and
/// descending into sub-fragments creates nodes.
#[derive(Debug)]
pub struct Classifier {
    arena: SchemaArena,
    memo: HashMap<(Origin, Predicate), bool>,
    predicate_guard: ResolutionGuard,
    classify_guard: ResolutionGuard,
}

impl Classifier {
    /// Start a classification pass over `arena`.
    pub fn new(arena: SchemaArena) -> Self {
        Self {
            arena,
            memo: HashMap::new(),
            predicate_guard: ResolutionGuard::new(),
            classify_guard: ResolutionGuard::new(),
        }
    }

    /// The arena being classified.
    pub fn arena(&self) -> &SchemaArena {
        &self.arena
    }

    /// Mutable access, for creating nodes between classifications.
    pub fn arena_mut(&mut self) -> &mut SchemaArena {
        &mut self.arena
    }

    /// End the pass and return the arena.
    pub fn into_arena(self) -> SchemaArena {
        self.arena
    }

    /// Classify a node: the first matching rule's category and outcome.
    ///
    /// Trait outcomes carry `allow_undefined = !required` from the node's
    /// metadata.
    pub fn classify(&mut self, id: NodeId) -> Result<Classification, SchemaError> {
        let origin = self.arena.node(id).origin();
        self.classify_guard.enter(origin.clone())?;
        let result = self.classify_unguarded(id);
        self.classify_guard.exit(&origin);
        result
    }

    fn classify_unguarded(&mut self, id: NodeId) -> Result<Classification, SchemaError> {
        for rule in RULES {
            if !(rule.matches)(self, id)? {
                continue;
            }
            let outcome = match (rule.build)(self, id)? {
                Outcome::Trait(v) => {
                    Outcome::Trait(v.with_allow_undefined(!self.arena.node(id).metadata().required))
                }
                other => other,
            };
            debug!(
                path = %self.arena.node(id).path(),
                category = ?rule.category,
                "classified schema node"
            );
            return Ok(Classification {
                category: rule.category,
                outcome,
            });
        }

        let node = self.arena.node(id);
        Err(SchemaError::UnrecognizedSchema {
            path: node.path(),
            keywords: node.keywords().keys.clone(),
        })
    }

    /// Whether the node yields a named object shape.
    pub fn is_object_like(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        self.predicate(id, Predicate::ObjectLike)
    }

    /// Whether the node reduces to a single validator.
    pub fn is_trait_like(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        self.predicate(id, Predicate::TraitLike)
    }

    fn predicate(&mut self, id: NodeId, which: Predicate) -> Result<bool, SchemaError> {
        let origin = self.arena.node(id).origin();
        if let Some(&cached) = self.memo.get(&(origin.clone(), which)) {
            return Ok(cached);
        }
        self.predicate_guard.enter(origin.clone())?;
        let result = self.evaluate(id, which);
        self.predicate_guard.exit(&origin);
        let value = result?;
        self.memo.insert((origin, which), value);
        Ok(value)
    }

    fn evaluate(&mut self, id: NodeId, which: Predicate) -> Result<bool, SchemaError> {
        let k = self.arena.node(id).keywords();
        if which == Predicate::TraitLike && k.types.is_non_object() {
            return Ok(true);
        }
        if k.has_properties {
            return Ok(which == Predicate::ObjectLike);
        }
        if k.reference.is_some() {
            let target = self.target(id)?;
            return self.predicate(target, which);
        }
        let c = k.composition;
        for (keyword, count) in [("anyOf", c.any_of), ("allOf", c.all_of), ("oneOf", c.one_of)] {
            if count == 0 {
                continue;
            }
            for i in 0..count {
                let branch = self.child(id, &[keyword, &i.to_string()])?;
                if !self.predicate(branch, which)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    fn child(&mut self, id: NodeId, segments: &[&str]) -> Result<NodeId, SchemaError> {
        self.arena.make_child(id, segments, None, NodeMetadata::default())
    }

    fn target(&mut self, id: NodeId) -> Result<NodeId, SchemaError> {
        match self.arena.resolve_ref(id)? {
            Some(target) => Ok(target),
            None => Err(SchemaError::invalid(self.arena.node(id).path(), "expected a $ref")),
        }
    }

    fn is_top_level(&self, id: NodeId) -> bool {
        self.arena.node(id).is_root() || self.arena.is_definition(id)
    }

    fn reference_to(&self, id: NodeId, def: ObjectDefinition) -> ObjectRef {
        if self.is_top_level(id) {
            ObjectRef::Named(def.name)
        } else {
            ObjectRef::Inline(Box::new(def))
        }
    }

    /// Follow a `$ref` chain to the fragment that declares the shape.
    fn follow_references(&mut self, id: NodeId) -> Result<NodeId, SchemaError> {
        let mut chain = ResolutionGuard::new();
        let mut current = id;
        while self.arena.node(current).is_reference() {
            chain.enter(self.arena.node(current).origin())?;
            current = self.target(current)?;
        }
        Ok(current)
    }

    /// A root or definition whose classification is in progress further up
    /// the stack. Its shape is not known yet, only its name.
    fn is_being_built(&self, id: NodeId) -> bool {
        self.is_top_level(id) && self.classify_guard.is_resolving(&self.arena.node(id).origin())
    }

    /// Whether the node is a root or definition the Object rule turns into
    /// a named shape, whatever its properties.
    fn builds_named_object(&self, id: NodeId) -> bool {
        let k = self.arena.node(id).keywords();
        self.is_top_level(id)
            && k.types.is("object")
            && k.reference.is_none()
            && k.enumeration.is_none()
            && !k.composition.any()
            && !k.composition.not
    }

    /// The object shape an object-like node designates, following `$ref`
    /// chains, and the reference a user of that shape should hold.
    fn object_shape(&mut self, id: NodeId) -> Result<(ObjectRef, ObjectDefinition), SchemaError> {
        let current = self.follow_references(id)?;
        let def = match self.classify(current)?.outcome {
            Outcome::Object(def) => def,
            // Properties alongside a keyword that wins earlier in the chain.
            Outcome::Trait(_) | Outcome::Reference(_) => self.object_definition(current)?,
        };
        Ok((self.reference_to(current, def.clone()), def))
    }

    /// Shape from `properties`, `required`, and `additionalProperties`.
    fn object_definition(&mut self, id: NodeId) -> Result<ObjectDefinition, SchemaError> {
        let mut def = ObjectDefinition::new(
            self.arena.inline_name(id),
            self.arena.config().base_class.clone(),
        );
        def.description = self.arena.node(id).keywords().description.clone();

        for (json_name, child) in self.arena.property_nodes(id)? {
            let required = self.arena.node(child).metadata().required;
            let validator = self
                .classify(child)?
                .outcome
                .into_validator()
                .with_allow_undefined(!required);
            def.properties.push(Property {
                name: regularize_name(&json_name),
                json_name,
                required,
                validator,
            });
        }

        let additional = self.arena.node(id).keywords().additional;
        def.additional_properties = match additional {
            AdditionalDecl::Absent | AdditionalDecl::Allowed(true) => AdditionalProperties::AcceptAny,
            AdditionalDecl::Allowed(false) => AdditionalProperties::Reject,
            AdditionalDecl::Schema => {
                let child = self.child(id, &["additionalProperties"])?;
                let v = self.classify(child)?.outcome.into_validator();
                AdditionalProperties::Validate(Box::new(v))
            }
        };
        Ok(def)
    }

    fn branch_validators(&mut self, id: NodeId, keyword: &str, count: usize) -> Result<Vec<Validator>, SchemaError> {
        (0..count)
            .map(|i| {
                let branch = self.child(id, &[keyword, &i.to_string()])?;
                Ok(self.classify(branch)?.outcome.into_validator())
            })
            .collect()
    }

    fn composite_object_matches(&mut self, id: NodeId, kind: CompositionKind) -> Result<bool, SchemaError> {
        let count = composition_count(self, id, kind);
        if count == 0 {
            return Ok(false);
        }
        for i in 0..count {
            let branch = self.child(id, &[kind.keyword(), &i.to_string()])?;
            if !self.is_object_like(branch)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn build_composite_object(&mut self, id: NodeId, kind: CompositionKind) -> Result<Outcome, SchemaError> {
        let node = self.arena.node(id);
        let path = node.path();
        let k = node.keywords();
        let additional_declared = k.additional != AdditionalDecl::Absent;
        let has_own_shape = k.has_properties || additional_declared;
        let count = composition_count(self, id, kind);

        let mut merge = ShapeMerge::new(kind, self.arena.config().merge_policy, path);
        let mut own = None;
        if has_own_shape {
            let def = self.object_definition(id)?;
            merge.add_own(def.clone(), additional_declared);
            own = Some(Box::new(def));
        }

        let mut branches = Vec::with_capacity(count);
        let mut unmerged = Vec::new();
        for i in 0..count {
            let branch = self.child(id, &[kind.keyword(), &i.to_string()])?;
            let target = self.follow_references(branch)?;
            if self.is_being_built(target) {
                let name = self.arena.inline_name(target);
                debug!(path = %self.arena.node(branch).path(), target = %name,
                    "recursive branch kept by name");
                merge.skip_branch();
                branches.push(ObjectRef::Named(name));
                unmerged.push(i);
                continue;
            }
            let (reference, def) = self.object_shape(target)?;
            merge.add_branch(def)?;
            branches.push(reference);
        }

        let mut def = ObjectDefinition::new(
            self.arena.inline_name(id),
            self.arena.config().base_class.clone(),
        );
        def.description = self.arena.node(id).keywords().description.clone();
        merge.finish(&mut def);
        def.composition = Some(ObjectComposition {
            kind,
            branches,
            own,
            unmerged,
        });
        Ok(Outcome::Object(def))
    }

    fn matches_any_of_object(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        self.composite_object_matches(id, CompositionKind::AnyOf)
    }

    fn build_any_of_object(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        self.build_composite_object(id, CompositionKind::AnyOf)
    }

    fn matches_one_of_object(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        self.composite_object_matches(id, CompositionKind::OneOf)
    }

    fn build_one_of_object(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        self.build_composite_object(id, CompositionKind::OneOf)
    }

    fn matches_all_of_object(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        self.composite_object_matches(id, CompositionKind::AllOf)
    }

    fn build_all_of_object(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        self.build_composite_object(id, CompositionKind::AllOf)
    }

    fn matches_ref_object(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        if !self.arena.node(id).is_reference() {
            return Ok(false);
        }
        let target = self.target(id)?;
        self.is_object_like(target)
    }

    /// Roots and definitions are referenced by name without being
    /// classified here, so recursive object schemas terminate.
    fn build_ref_object(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let target = self.follow_references(id)?;
        if self.is_top_level(target) {
            return Ok(Outcome::Reference(ObjectRef::Named(self.arena.inline_name(target))));
        }
        let (reference, _) = self.object_shape(target)?;
        Ok(Outcome::Reference(reference))
    }

    fn matches_ref_trait(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).is_reference())
    }

    /// References are transparent for trait-like targets. A target that
    /// still builds an object shape (an object definition without
    /// properties) is referenced by name.
    fn build_ref_trait(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let target = self.target(id)?;
        if self.builds_named_object(target) {
            return Ok(Outcome::Reference(ObjectRef::Named(self.arena.inline_name(target))));
        }
        Ok(match self.classify(target)?.outcome {
            Outcome::Trait(v) => Outcome::Trait(v),
            Outcome::Object(def) => Outcome::Reference(self.reference_to(target, def)),
            Outcome::Reference(r) => Outcome::Reference(r),
        })
    }

    fn matches_not(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().composition.not)
    }

    fn build_not(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let inner = self.child(id, &["not"])?;
        let v = self.classify(inner)?.outcome.into_validator();
        Ok(Outcome::Trait(Validator::not(v)))
    }

    fn matches_any_of(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().composition.any_of > 0)
    }

    fn build_any_of(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let count = self.arena.node(id).keywords().composition.any_of;
        Ok(Outcome::Trait(Validator::any_of(self.branch_validators(id, "anyOf", count)?)))
    }

    fn matches_all_of(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().composition.all_of > 0)
    }

    fn build_all_of(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let count = self.arena.node(id).keywords().composition.all_of;
        Ok(Outcome::Trait(Validator::all_of(self.branch_validators(id, "allOf", count)?)))
    }

    fn matches_one_of(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().composition.one_of > 0)
    }

    fn build_one_of(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let count = self.arena.node(id).keywords().composition.one_of;
        Ok(Outcome::Trait(Validator::one_of(self.branch_validators(id, "oneOf", count)?)))
    }

    fn matches_enum(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().enumeration.is_some())
    }

    fn build_enum(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let values = self.arena.node(id).keywords().enumeration.clone().unwrap_or_default();
        Ok(Outcome::Trait(Validator::enumeration(values)))
    }

    fn matches_simple_type(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(matches!(
            &self.arena.node(id).keywords().types,
            TypeDecl::Single(t) if PRIMITIVE_TYPES.contains(&t.as_str())
        ))
    }

    fn build_simple_type(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let k = self.arena.node(id).keywords();
        let validator = match &k.types {
            TypeDecl::Single(t) => primitive(t, k).ok_or_else(|| {
                SchemaError::invalid(self.arena.node(id).path(), format!("'{t}' is not a primitive type"))
            })?,
            TypeDecl::Multiple(_) => {
                return Err(SchemaError::invalid(self.arena.node(id).path(), "expected a single type"))
            }
        };
        Ok(Outcome::Trait(validator))
    }

    fn matches_compound_type(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(matches!(
            &self.arena.node(id).keywords().types,
            TypeDecl::Multiple(names) if names.iter().all(|t| compound_member(t))
        ))
    }

    fn build_compound_type(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let k = self.arena.node(id).keywords();
        let TypeDecl::Multiple(names) = &k.types else {
            return Err(SchemaError::invalid(self.arena.node(id).path(), "expected a list of types"));
        };
        let members = names
            .iter()
            .map(|t| match t.as_str() {
                "array" => Ok(Validator::array_with(ArrayConstraints::default())),
                "object" => Ok(Validator::instance_of(InstanceType::Mapping)),
                other => primitive(other, k).ok_or_else(|| {
                    SchemaError::invalid(self.arena.node(id).path(), format!("unknown type '{other}'"))
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Outcome::Trait(Validator::union(members)))
    }

    fn matches_array(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().types.is("array"))
    }

    fn build_array(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let k = self.arena.node(id).keywords();
        let (items_decl, min_items, max_items) = (k.items, k.min_items, k.max_items);
        let items = match items_decl {
            ItemsDecl::Absent => Items::Any,
            ItemsDecl::Single => {
                let item = self.child(id, &["items"])?;
                Items::Each(Box::new(self.classify(item)?.outcome.into_validator()))
            }
            ItemsDecl::Tuple(count) => Items::Positional(self.branch_validators(id, "items", count)?),
        };
        Ok(Outcome::Trait(Validator::array_with(ArrayConstraints {
            items,
            min_items,
            max_items,
        })))
    }

    fn matches_object(&mut self, id: NodeId) -> Result<bool, SchemaError> {
        Ok(self.arena.node(id).keywords().types.is("object"))
    }

    /// Roots, definitions, and fragments with `properties` or a restrictive
    /// `additionalProperties` get an object shape. Any other object
    /// fragment is a schema-less mapping slot.
    fn build_object(&mut self, id: NodeId) -> Result<Outcome, SchemaError> {
        let k = self.arena.node(id).keywords();
        if !(k.has_properties || k.additional.is_restrictive() || self.is_top_level(id)) {
            return Ok(Outcome::Trait(Validator::instance_of(InstanceType::Mapping)));
        }
        Ok(Outcome::Object(self.object_definition(id)?))
    }
}

fn composition_count(classifier: &Classifier, id: NodeId, kind: CompositionKind) -> usize {
    let c = classifier.arena.node(id).keywords().composition;
    match kind {
        CompositionKind::AnyOf => c.any_of,
        CompositionKind::OneOf => c.one_of,
        CompositionKind::AllOf => c.all_of,
    }
}

fn compound_member(name: &str) -> bool {
    PRIMITIVE_TYPES.contains(&name) || name == "array" || name == "object"
}

fn primitive(name: &str, k: &crate::keywords::Keywords) -> Option<Validator> {
    Some(match name {
        "null" => Validator::null(),
        "boolean" => Validator::boolean(),
        "number" => Validator::number_with(k.numeric.clone()),
        "integer" => Validator::integer_with(k.numeric.clone()),
        "string" => Validator::string_with(k.string.clone()),
        _ => return None,
    })
}

/// Merges branch shapes of a composed object.
///
/// - Properties are the ordered union: own properties, then each branch's.
/// - `allOf`: a property is required if any part requires it. A property
///   defined twice with different descriptors is resolved by the
///   [`MergePolicy`].
/// - `anyOf`/`oneOf`: a property is required if the node itself requires it
///   or every branch does. Differing descriptors become an `anyOf` of the
///   distinct shapes; the branch check enforces the rest.
/// - Additional properties: `allOf` keeps the most restrictive policy,
///   `anyOf`/`oneOf` the least restrictive.
struct ShapeMerge {
    kind: CompositionKind,
    policy: MergePolicy,
    path: String,
    properties: Vec<Property>,
    own_required: HashSet<String>,
    branch_required: HashMap<String, usize>,
    branches: usize,
    additional: Option<AdditionalProperties>,
}

impl ShapeMerge {
    fn new(kind: CompositionKind, policy: MergePolicy, path: String) -> Self {
        Self {
            kind,
            policy,
            path,
            properties: Vec::new(),
            own_required: HashSet::new(),
            branch_required: HashMap::new(),
            branches: 0,
            additional: None,
        }
    }

    fn add_own(&mut self, def: ObjectDefinition, additional_declared: bool) {
        for prop in def.properties {
            if prop.required {
                self.own_required.insert(prop.json_name.clone());
            }
            self.properties.push(prop);
        }
        if additional_declared {
            self.additional = Some(def.additional_properties);
        }
    }

    fn add_branch(&mut self, def: ObjectDefinition) -> Result<(), SchemaError> {
        self.branches += 1;
        for prop in def.properties {
            if prop.required {
                *self.branch_required.entry(prop.json_name.clone()).or_default() += 1;
            }
            self.merge_property(prop)?;
        }
        self.merge_additional(def.additional_properties);
        Ok(())
    }

    /// A branch whose shape is validated separately. Nothing it requires can
    /// be assumed, and under `anyOf`/`oneOf` it may accept any key.
    fn skip_branch(&mut self) {
        self.branches += 1;
        if self.kind != CompositionKind::AllOf {
            self.merge_additional(AdditionalProperties::AcceptAny);
        }
    }

    fn merge_property(&mut self, prop: Property) -> Result<(), SchemaError> {
        let Some(existing) = self.properties.iter_mut().find(|p| p.json_name == prop.json_name) else {
            self.properties.push(prop);
            return Ok(());
        };
        if existing.validator.same_shape(&prop.validator) {
            return Ok(());
        }

        match (self.kind, self.policy) {
            (CompositionKind::AllOf, MergePolicy::Reject) => {
                return Err(SchemaError::ConflictingComposition {
                    path: self.path.clone(),
                    property: prop.json_name,
                })
            }
            (CompositionKind::AllOf, MergePolicy::LastWriteWins) => {
                warn!(path = %self.path, property = %prop.json_name, policy = %self.policy,
                    "conflicting allOf property descriptor replaced by later branch");
                existing.validator = prop.validator;
            }
            (CompositionKind::AllOf, MergePolicy::FirstWriteWins) => {
                warn!(path = %self.path, property = %prop.json_name, policy = %self.policy,
                    "conflicting allOf property descriptor from later branch ignored");
            }
            (CompositionKind::AnyOf | CompositionKind::OneOf, _) => {
                existing.validator = union_of_shapes(existing.validator.clone(), prop.validator);
            }
        }
        Ok(())
    }

    fn merge_additional(&mut self, incoming: AdditionalProperties) {
        let replace = match &self.additional {
            None => true,
            Some(current) => match self.kind {
                CompositionKind::AllOf => incoming.rank() > current.rank(),
                CompositionKind::AnyOf | CompositionKind::OneOf => incoming.rank() < current.rank(),
            },
        };
        if replace {
            self.additional = Some(incoming);
        }
    }

    fn finish(self, def: &mut ObjectDefinition) {
        for mut prop in self.properties {
            let in_branches = self.branch_required.get(&prop.json_name).copied().unwrap_or(0);
            prop.required = self.own_required.contains(&prop.json_name)
                || match self.kind {
                    CompositionKind::AllOf => in_branches > 0,
                    CompositionKind::AnyOf | CompositionKind::OneOf => {
                        self.branches > 0 && in_branches == self.branches
                    }
                };
            prop.validator.allow_undefined = !prop.required;
            def.properties.push(prop);
        }
        def.additional_properties = self.additional.unwrap_or_default();
    }
}

fn union_of_shapes(existing: Validator, incoming: Validator) -> Validator {
    match existing.kind {
        ValidatorKind::AnyOf { mut branches } => {
            if !branches.iter().any(|b| b.same_shape(&incoming)) {
                branches.push(incoming);
            }
            Validator::any_of(branches)
        }
        kind => Validator::any_of(vec![Validator::new(kind), incoming]),
    }
}
