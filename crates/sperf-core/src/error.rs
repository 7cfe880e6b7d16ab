//! # Error Types — Structured Error Hierarchy
//!
//! Defines the error types used throughout sperf. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Structural errors ([`SchemaError`]) carry the JSON Pointer of the
//!   offending fragment or the `$ref` string that failed, and abort building
//!   the model for that node. No partial model is returned.
//! - Per-value errors ([`ValidationError`]) carry the instance path, the
//!   keyword that failed, and the offending value. They are returned as
//!   ordinary results and never used for control flow.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for sperf.
#[derive(Error, Debug)]
pub enum SperfError {
    /// Reference resolution or classification failed.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A value did not satisfy its descriptor.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Canonical serialization of a schema fragment failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Structural error raised while resolving or classifying a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// The `$ref` string is empty or not a local fragment reference.
    #[error("invalid $ref format '{reference}': only local fragment references ('#', '#/a/b') are supported")]
    InvalidReferenceFormat {
        /// The offending reference string.
        reference: String,
    },

    /// A path segment of the `$ref` does not exist in the context document.
    #[error("unresolved $ref '{reference}': segment '{segment}' is not present in the schema")]
    UnresolvedReference {
        /// The reference being resolved.
        reference: String,
        /// First segment that could not be found.
        segment: String,
    },

    /// Resolution re-entered a fragment that is still being resolved.
    #[error("cyclic reference to '{reference}' (resolution chain: {})", .chain.join(" -> "))]
    CyclicReference {
        /// Fragment that was re-entered, as a `#`-prefixed JSON Pointer.
        reference: String,
        /// Fragments in progress when the cycle closed, outermost first.
        chain: Vec<String>,
    },

    /// No classification rule matched the fragment.
    #[error("no classification rule matched the schema at '{path}' with keywords {keywords:?}")]
    UnrecognizedSchema {
        /// Location of the fragment.
        path: String,
        /// The raw keyword set of the fragment, for diagnostics.
        keywords: Vec<String>,
    },

    /// Two `allOf` branches define the same property with different descriptors.
    #[error("conflicting definitions of property '{property}' across allOf branches at '{path}'")]
    ConflictingComposition {
        /// Location of the composed fragment.
        path: String,
        /// The property defined more than once.
        property: String,
    },

    /// The fragment is not a JSON object, or a keyword carries a malformed value.
    #[error("invalid schema at '{path}': {reason}")]
    InvalidSchema {
        /// Location of the fragment.
        path: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl SchemaError {
    /// Build an [`SchemaError::InvalidSchema`] for the fragment at `path`.
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSchema {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Per-value validation failure.
///
/// `path` is a JSON Pointer into the validated instance; the empty string
/// denotes the instance root and renders as `(root)`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    /// The value has the wrong JSON type for the descriptor.
    #[error("type mismatch at {}: expected {expected}, found {found}", display_path(.path))]
    TypeMismatch {
        /// Instance path.
        path: String,
        /// Expected type (or types).
        expected: String,
        /// Actual JSON type of the value.
        found: String,
    },

    /// The value has an acceptable type but violates a keyword constraint.
    #[error("'{keyword}' violated at {} by {value}: {reason}", display_path(.path))]
    ConstraintViolation {
        /// Instance path.
        path: String,
        /// The JSON Schema keyword that failed (`minimum`, `oneOf`, `required`, ...).
        keyword: String,
        /// Rendering of the offending value (`undefined` for an absent value).
        value: String,
        /// Which bound, branch, or property caused the failure.
        reason: String,
    },
}

impl ValidationError {
    /// The keyword responsible for the failure. Type mismatches report `type`.
    pub fn keyword(&self) -> &str {
        match self {
            Self::TypeMismatch { .. } => "type",
            Self::ConstraintViolation { keyword, .. } => keyword,
        }
    }

    /// The instance path of the failure.
    pub fn path(&self) -> &str {
        match self {
            Self::TypeMismatch { path, .. } | Self::ConstraintViolation { path, .. } => path,
        }
    }

    /// Returns true if this is a [`ValidationError::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch { .. })
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "(root)"
    } else {
        path
    }
}

/// Error loading a [`crate::ModelConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config '{path}': {source}")]
    Io {
        /// Path of the config file.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The YAML text is malformed or has unknown fields.
    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The JSON text is malformed or has unknown fields.
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JCS serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
