//! # sperf-validate — Validator Semantics
//!
//! A family of composable validator descriptors (null, boolean, number,
//! integer, string, array, enum, instance-of, union, anyOf, oneOf, allOf,
//! not) and the named object shapes built from them. Every descriptor has a
//! `validate(value) -> Result<(), ValidationError>` contract.
//!
//! ## Absent vs. null
//!
//! [`Instance::Undefined`] represents "property absent" and is distinct from
//! JSON `null`. Each [`Validator`] carries `allow_undefined`: when true an
//! absent value always passes, regardless of any other constraint; when false
//! (the property is required) it fails with a `required` violation.
//!
//! ## Object references
//!
//! A descriptor may point at a named object shape
//! ([`InstanceType::Object`]). Resolving that name requires the whole model,
//! so validation goes through the [`ObjectLookup`] seam. Without a lookup
//! ([`NoLookup`]) a named reference is a composite type check only.
//!
//! ## Crate Policy
//!
//! - Depends only on `sperf-core` internally.
//! - Validation errors are values, never panics.

pub mod descriptor;
pub mod instance;
pub mod object;
mod semantics;

pub use descriptor::{
    ArrayConstraints, InstanceType, Items, NumericConstraints, StringConstraints, Validator,
    ValidatorKind,
};
pub use instance::{json_equal, json_type_name, Instance};
pub use object::{
    AdditionalProperties, CompositionKind, NoLookup, ObjectComposition, ObjectDefinition,
    ObjectLookup, ObjectRef, Property,
};
pub use sperf_core::ValidationError;
