//! Parser configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::resolve::ResolverConfig;
use crate::strain::StrainConfig;

/// Configuration for a [`Parser`](crate::Parser)
///
/// Every field is optional in JSON; missing fields take their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Strain and performance constants
    pub strain: StrainConfig,
    /// Frame matching tuning
    pub resolver: ResolverConfig,
}

impl ParserConfig {
    /// Parse and validate config from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate().map_err(|e| match e {
            Error::Config(reason) => Error::Config(format!("{}: {}", path.display(), reason)),
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "Loaded parser config");
        Ok(config)
    }

    /// Check every setting is in its usable range.
    pub fn validate(&self) -> Result<()> {
        self.strain.validate()?;
        self.resolver.validate()
    }

    /// Save config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = ParserConfig::from_json_str("{}").unwrap();
        assert_eq!(config.strain, StrainConfig::default());
        assert_eq!(config.resolver.radius_scale, 1.0);
        assert!(!config.resolver.require_press);
    }

    #[test]
    fn test_partial_override() {
        let config = ParserConfig::from_json_str(
            r#"{"strain": {"section_length": 200.0}, "resolver": {"require_press": true}}"#,
        )
        .unwrap();
        assert_eq!(config.strain.section_length, 200.0);
        assert_eq!(config.strain.decay_weight, StrainConfig::default().decay_weight);
        assert!(config.resolver.require_press);
    }

    #[test]
    fn test_invalid_json() {
        let err = ParserConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for json in [
            r#"{"strain": {"section_length": -400.0}}"#,
            r#"{"strain": {"section_length": 0.0}}"#,
            r#"{"strain": {"min_strain_time": 0.0}}"#,
            r#"{"strain": {"top_peaks": 0}}"#,
            r#"{"strain": {"aim": {"skill_multiplier": 26.25, "strain_decay_base": 1.2}}}"#,
            r#"{"resolver": {"radius_scale": 0.0}}"#,
        ] {
            let err = ParserConfig::from_json_str(json).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{} gave {:?}", json, err);
        }
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"strain": {"section_length": -1.0}}"#).unwrap();

        let err = ParserConfig::load(&path).unwrap_err();
        assert!(matches!(&err, Error::Config(reason) if reason.contains("section_length")));
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let mut config = ParserConfig::default();
        config.resolver.radius_scale = 1.25;
        config.save(&path).unwrap();

        let loaded = ParserConfig::load(&path).unwrap();
        assert_eq!(loaded.resolver.radius_scale, 1.25);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let err = ParserConfig::load(temp.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
