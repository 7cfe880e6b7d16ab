//! # Model Configuration
//!
//! Typed configuration for model assembly. Every field has a documented
//! default, so an empty YAML document (or `ModelConfig::default()`) yields
//! the standard behaviour:
//!
//! | Field | Default |
//! |---|---|
//! | `merge_policy` | `reject` |
//! | `definition_tags` | `["definitions"]` |
//! | `module` | none |
//! | `root_name` | `Root` |
//! | `base_class` | `JsonHasTraits` |
//!
//! Unknown keys are rejected so that a typo in a config file fails loudly
//! instead of silently falling back to a default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How conflicting property descriptors across `allOf` object branches are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// Fail with `ConflictingComposition`.
    #[default]
    Reject,
    /// The later branch's descriptor replaces the earlier one.
    LastWriteWins,
    /// The earlier branch's descriptor is kept.
    FirstWriteWins,
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Reject => "reject",
            Self::LastWriteWins => "last_write_wins",
            Self::FirstWriteWins => "first_write_wins",
        })
    }
}

/// Configuration for resolving and classifying a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelConfig {
    /// Merge policy for conflicting `allOf` properties.
    pub merge_policy: MergePolicy,
    /// Keywords whose mappings hold named definitions.
    pub definition_tags: Vec<String>,
    /// Optional module qualifier for fully-qualified class names.
    pub module: Option<String>,
    /// Class name of the root schema.
    pub root_name: String,
    /// Base-class marker attached to every named object definition.
    pub base_class: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::Reject,
            definition_tags: vec!["definitions".to_string()],
            module: None,
            root_name: "Root".to_string(),
            base_class: "JsonHasTraits".to_string(),
        }
    }
}

impl ModelConfig {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load a configuration file.
    ///
    /// `.json` files are parsed as JSON; everything else as YAML (which
    /// also accepts JSON documents).
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Builder-style override of the merge policy.
    pub fn with_merge_policy(mut self, policy: MergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// Builder-style override of the module qualifier.
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Qualify a class name with the configured module, if any.
    pub fn qualified_name(&self, classname: &str) -> String {
        match &self.module {
            Some(module) if !module.is_empty() => format!("{module}.{classname}"),
            _ => classname.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.merge_policy, MergePolicy::Reject);
        assert_eq!(config.definition_tags, vec!["definitions"]);
        assert_eq!(config.root_name, "Root");
        assert!(config.module.is_none());
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = ModelConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, ModelConfig::default());
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
merge_policy: last_write_wins
definition_tags: [definitions, "$defs"]
module: vegalite
"#;
        let config = ModelConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::LastWriteWins);
        assert_eq!(config.definition_tags, vec!["definitions", "$defs"]);
        assert_eq!(config.qualified_name("Mark"), "vegalite.Mark");
        assert_eq!(config.root_name, "Root");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = ModelConfig::from_yaml_str("merge_polcy: reject").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_json_config() {
        let config =
            ModelConfig::from_json_str(r#"{"merge_policy": "first_write_wins"}"#).unwrap();
        assert_eq!(config.merge_policy, MergePolicy::FirstWriteWins);
    }

    #[test]
    fn test_from_path_dispatches_on_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("model.json");
        let mut f = std::fs::File::create(&json_path).unwrap();
        write!(f, r#"{{"root_name": "Spec"}}"#).unwrap();
        assert_eq!(ModelConfig::from_path(&json_path).unwrap().root_name, "Spec");

        let yaml_path = dir.path().join("model.yaml");
        std::fs::write(&yaml_path, "base_class: Base\n").unwrap();
        assert_eq!(ModelConfig::from_path(&yaml_path).unwrap().base_class, "Base");
    }

    #[test]
    fn test_from_path_missing_file() {
        let err = ModelConfig::from_path("/nonexistent/sperf.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/sperf.yaml"));
    }

    #[test]
    fn test_qualified_name_without_module() {
        let config = ModelConfig::default();
        assert_eq!(config.qualified_name("Root"), "Root");
        let config = config.with_module("");
        assert_eq!(config.qualified_name("Root"), "Root");
    }
}
