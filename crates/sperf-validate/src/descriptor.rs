//! # Validator Descriptors
//!
//! A [`Validator`] is a tagged variant over the JSON Schema value categories
//! plus an `allow_undefined` flag. Descriptors are plain data: an emitter can
//! read the category tag and constraint parameters to render them in any
//! target representation, and [`Validator::validate`] interprets them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::object::ObjectRef;

/// Bounds and multiple constraints for `number` and `integer` descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraints {
    /// Lower bound (`minimum`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    /// Upper bound (`maximum`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    /// When true the lower bound is strict.
    #[serde(default)]
    pub exclusive_minimum: bool,
    /// When true the upper bound is strict.
    #[serde(default)]
    pub exclusive_maximum: bool,
    /// The value must be an integral multiple of this (`multipleOf`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

impl NumericConstraints {
    /// Set `minimum`.
    pub fn minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    /// Set `maximum`.
    pub fn maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    /// Make both bounds strict or inclusive.
    pub fn exclusive(mut self, exclusive_minimum: bool, exclusive_maximum: bool) -> Self {
        self.exclusive_minimum = exclusive_minimum;
        self.exclusive_maximum = exclusive_maximum;
        self
    }

    /// Set `multipleOf`.
    pub fn multiple_of(mut self, multiple: f64) -> Self {
        self.multiple_of = Some(multiple);
        self
    }

    /// True when no constraint is set.
    pub fn is_unconstrained(&self) -> bool {
        self.minimum.is_none() && self.maximum.is_none() && self.multiple_of.is_none()
    }
}

/// Length constraints for `string` descriptors, counted in Unicode scalar values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StringConstraints {
    /// `minLength`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    /// `maxLength`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
}

/// Item descriptors of an array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "validators", rename_all = "snake_case")]
pub enum Items {
    /// No `items` keyword: every element is accepted.
    #[default]
    Any,
    /// Every element satisfies one descriptor.
    Each(Box<Validator>),
    /// Element `i` satisfies descriptor `i`; elements past the list are unconstrained.
    Positional(Vec<Validator>),
}

/// Item and length constraints for `array` descriptors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrayConstraints {
    /// Element descriptor(s).
    pub items: Items,
    /// `minItems`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    /// `maxItems`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

/// The native composite type checked by an `InstanceOf` descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "object", rename_all = "snake_case")]
pub enum InstanceType {
    /// Any JSON object (a schema-less mapping slot).
    Mapping,
    /// A generated named object shape.
    Object(ObjectRef),
}

/// The category of a [`Validator`] and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum ValidatorKind {
    /// JSON `null`.
    Null,
    /// `true` / `false`.
    Boolean,
    /// Any number, subject to bounds.
    Number(NumericConstraints),
    /// Integral numbers, subject to bounds.
    Integer(NumericConstraints),
    /// Strings, subject to length bounds.
    String(StringConstraints),
    /// Sequences.
    Array(ArrayConstraints),
    /// Member-equal to one of the allowed values.
    Enum {
        /// Allowed values.
        values: Vec<Value>,
    },
    /// A composite native type.
    InstanceOf {
        /// The type checked.
        instance: InstanceType,
    },
    /// Type-level OR (`type: [a, b]`).
    Union {
        /// Member descriptors.
        members: Vec<Validator>,
    },
    /// At least one branch validates.
    AnyOf {
        /// Branch descriptors.
        branches: Vec<Validator>,
    },
    /// Exactly one branch validates.
    OneOf {
        /// Branch descriptors.
        branches: Vec<Validator>,
    },
    /// Every branch validates.
    AllOf {
        /// Branch descriptors.
        branches: Vec<Validator>,
    },
    /// The wrapped descriptor fails.
    Not {
        /// The negated descriptor.
        inner: Box<Validator>,
    },
}

/// A validator descriptor: a category plus the undefined-handling flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Validator {
    /// Category and parameters.
    pub kind: ValidatorKind,
    /// Whether an absent value passes.
    pub allow_undefined: bool,
}

impl Validator {
    /// Wrap a kind with `allow_undefined = true`.
    pub fn new(kind: ValidatorKind) -> Self {
        Self {
            kind,
            allow_undefined: true,
        }
    }

    /// `null` descriptor.
    pub fn null() -> Self {
        Self::new(ValidatorKind::Null)
    }

    /// `boolean` descriptor.
    pub fn boolean() -> Self {
        Self::new(ValidatorKind::Boolean)
    }

    /// Unconstrained `number` descriptor.
    pub fn number() -> Self {
        Self::number_with(NumericConstraints::default())
    }

    /// Constrained `number` descriptor.
    pub fn number_with(constraints: NumericConstraints) -> Self {
        Self::new(ValidatorKind::Number(constraints))
    }

    /// Unconstrained `integer` descriptor.
    pub fn integer() -> Self {
        Self::integer_with(NumericConstraints::default())
    }

    /// Constrained `integer` descriptor.
    pub fn integer_with(constraints: NumericConstraints) -> Self {
        Self::new(ValidatorKind::Integer(constraints))
    }

    /// Unconstrained `string` descriptor.
    pub fn string() -> Self {
        Self::string_with(StringConstraints::default())
    }

    /// Constrained `string` descriptor.
    pub fn string_with(constraints: StringConstraints) -> Self {
        Self::new(ValidatorKind::String(constraints))
    }

    /// Array whose every element satisfies `item`.
    pub fn array_of(item: Validator) -> Self {
        Self::array_with(ArrayConstraints {
            items: Items::Each(Box::new(item)),
            ..ArrayConstraints::default()
        })
    }

    /// Constrained array descriptor.
    pub fn array_with(constraints: ArrayConstraints) -> Self {
        Self::new(ValidatorKind::Array(constraints))
    }

    /// Enumerated values.
    pub fn enumeration(values: Vec<Value>) -> Self {
        Self::new(ValidatorKind::Enum { values })
    }

    /// Composite native type check.
    pub fn instance_of(instance: InstanceType) -> Self {
        Self::new(ValidatorKind::InstanceOf { instance })
    }

    /// Type-level union.
    pub fn union(members: Vec<Validator>) -> Self {
        Self::new(ValidatorKind::Union { members })
    }

    /// Non-exclusive composition.
    pub fn any_of(branches: Vec<Validator>) -> Self {
        Self::new(ValidatorKind::AnyOf { branches })
    }

    /// Exclusive composition.
    pub fn one_of(branches: Vec<Validator>) -> Self {
        Self::new(ValidatorKind::OneOf { branches })
    }

    /// Conjunctive composition.
    pub fn all_of(branches: Vec<Validator>) -> Self {
        Self::new(ValidatorKind::AllOf { branches })
    }

    /// Negation.
    pub fn not(inner: Validator) -> Self {
        Self::new(ValidatorKind::Not {
            inner: Box::new(inner),
        })
    }

    /// Mark the descriptor as required: an absent value fails.
    pub fn required(self) -> Self {
        self.with_allow_undefined(false)
    }

    /// Set `allow_undefined`.
    pub fn with_allow_undefined(mut self, allow_undefined: bool) -> Self {
        self.allow_undefined = allow_undefined;
        self
    }

    /// Set `minItems`/`maxItems` on an array descriptor. Other kinds are returned unchanged.
    pub fn with_item_bounds(mut self, min_items: Option<u64>, max_items: Option<u64>) -> Self {
        if let ValidatorKind::Array(c) = &mut self.kind {
            c.min_items = min_items;
            c.max_items = max_items;
        }
        self
    }

    /// The category tag, as used in the serialized form.
    pub fn category(&self) -> &'static str {
        match &self.kind {
            ValidatorKind::Null => "null",
            ValidatorKind::Boolean => "boolean",
            ValidatorKind::Number(_) => "number",
            ValidatorKind::Integer(_) => "integer",
            ValidatorKind::String(_) => "string",
            ValidatorKind::Array(_) => "array",
            ValidatorKind::Enum { .. } => "enum",
            ValidatorKind::InstanceOf { .. } => "instance_of",
            ValidatorKind::Union { .. } => "union",
            ValidatorKind::AnyOf { .. } => "any_of",
            ValidatorKind::OneOf { .. } => "one_of",
            ValidatorKind::AllOf { .. } => "all_of",
            ValidatorKind::Not { .. } => "not",
        }
    }

    /// Structural equality ignoring `allow_undefined` at every level.
    ///
    /// Two property descriptors that differ only in whether the property is
    /// required describe the same value shape.
    pub fn same_shape(&self, other: &Validator) -> bool {
        self.clone().normalized() == other.clone().normalized()
    }

    fn normalized(mut self) -> Self {
        self.allow_undefined = true;
        self.kind = match self.kind {
            ValidatorKind::Array(mut c) => {
                c.items = match c.items {
                    Items::Any => Items::Any,
                    Items::Each(v) => Items::Each(Box::new(v.normalized())),
                    Items::Positional(vs) => {
                        Items::Positional(vs.into_iter().map(Self::normalized).collect())
                    }
                };
                ValidatorKind::Array(c)
            }
            ValidatorKind::Union { members } => ValidatorKind::Union {
                members: members.into_iter().map(Self::normalized).collect(),
            },
            ValidatorKind::AnyOf { branches } => ValidatorKind::AnyOf {
                branches: branches.into_iter().map(Self::normalized).collect(),
            },
            ValidatorKind::OneOf { branches } => ValidatorKind::OneOf {
                branches: branches.into_iter().map(Self::normalized).collect(),
            },
            ValidatorKind::AllOf { branches } => ValidatorKind::AllOf {
                branches: branches.into_iter().map(Self::normalized).collect(),
            },
            ValidatorKind::Not { inner } => ValidatorKind::Not {
                inner: Box::new(inner.normalized()),
            },
            other => other,
        };
        self
    }
}
