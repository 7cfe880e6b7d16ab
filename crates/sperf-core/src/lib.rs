//! # sperf-core — Foundational Types for sperf
//!
//! Leaf crate of the sperf workspace. Everything that interprets a JSON
//! Schema (`sperf-schema`) or validates values against the resulting model
//! (`sperf-validate`) shares the primitives defined here.
//!
//! ## Key Design Principles
//!
//! 1. **One error hierarchy.** Structural problems with a schema
//!    ([`SchemaError`]) abort model building for the offending node.
//!    Per-value problems ([`ValidationError`]) are plain results that callers
//!    can collect and continue past.
//!
//! 2. **Explicit configuration.** [`ModelConfig`] is a typed struct with a
//!    documented default for every field, loadable from YAML or JSON.
//!
//! 3. **Canonical digests.** [`schema_digest`] hashes the JCS form of a
//!    fragment, so two fragments that differ only in key order hash equally.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `sperf-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod error;
pub mod naming;
pub mod pointer;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use config::{MergePolicy, ModelConfig};
pub use digest::{schema_digest, sha256_digest, SchemaDigest};
pub use error::{
    CanonicalizationError, ConfigError, SchemaError, SperfError, ValidationError,
};
pub use naming::regularize_name;
