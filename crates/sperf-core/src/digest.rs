//! # Schema Digest — Content Identity of Schema Fragments
//!
//! A `SchemaDigest` is the SHA-256 of a fragment's [`CanonicalBytes`]. The
//! model assembler attaches one to every top-level entry so an emitter can
//! tell whether a definition changed between two schema revisions, and can
//! deduplicate structurally identical definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CanonicalizationError;

/// A SHA-256 digest of a canonicalized schema fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchemaDigest {
    /// The raw 32-byte digest value.
    pub bytes: [u8; 32],
}

impl SchemaDigest {
    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for SchemaDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// Compute the SHA-256 digest of canonical bytes.
///
/// Accepts only `&CanonicalBytes`, so every digest flows through JCS.
pub fn sha256_digest(data: &CanonicalBytes) -> SchemaDigest {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hasher.finalize());
    SchemaDigest { bytes }
}

/// Canonicalize and hash a schema fragment.
pub fn schema_digest(fragment: &serde_json::Value) -> Result<SchemaDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(fragment)?;
    Ok(sha256_digest(&canonical))
}
