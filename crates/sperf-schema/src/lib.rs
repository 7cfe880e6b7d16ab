//! # sperf-schema — Schema Resolution and Classification
//!
//! Turns a JSON Schema document into a closed, classified [`Model`].
//!
//! ## Pipeline
//!
//! 1. [`SchemaArena::add_root`] takes ownership of the document and wraps it
//!    as the root [`node::SchemaNode`]. Sub-fragments are wrapped on demand,
//!    deduplicated by location, name, and metadata.
//! 2. The resolver ([`SchemaArena::resolve`]) turns local `$ref` strings into
//!    nodes of the same document.
//! 3. The [`Classifier`] assigns each node the first matching
//!    [`Category`] of [`CLASSIFICATION_ORDER`] and builds its validator
//!    descriptor or object shape.
//! 4. [`Model::build`] drives the classifier over the root and every
//!    definition.
//!
//! ## Crate Policy
//!
//! - Structural errors are `sperf_core::SchemaError` and abort the model.
//! - Emits `tracing` events only; no subscriber is installed here.
//! - Nodes are referenced by [`NodeId`] into one arena, so parent links and
//!   cyclic `$ref` graphs need no shared ownership.

pub mod classify;
pub mod keywords;
pub mod model;
pub mod node;
pub mod resolver;

pub use classify::{Category, Classification, Classifier, Outcome, CLASSIFICATION_ORDER};
pub use keywords::Keywords;
pub use model::{Model, ModelEntry};
pub use node::{NodeId, NodeMetadata, Origin, SchemaArena, SchemaNode};
pub use resolver::{parse_reference, ResolutionGuard};
