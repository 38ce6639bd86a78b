use std::path::Path;

use tracing::warn;

use crate::checkpoint::CheckpointManagerConfig;
use crate::error::ConfigError;
use crate::evaluation::EvaluatorConfig;

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub checkpoint: CheckpointManagerConfig,
    pub evaluation: EvaluatorConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checkpoint.keep_recent == 0 {
            return Err(ConfigError::Validation(
                "checkpoint.keep_recent must be >= 1".into(),
            ));
        }
        if self.checkpoint.checkpoint_dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "checkpoint.checkpoint_dir must not be empty".into(),
            ));
        }
        if self.evaluation.num_batches == Some(0) {
            return Err(ConfigError::Validation(
                "evaluation.num_batches must be >= 1 when set".into(),
            ));
        }
        if self.evaluation.log_interval == 0 {
            return Err(ConfigError::Validation(
                "evaluation.log_interval must be >= 1".into(),
            ));
        }
        if self.evaluation.primary_model.is_empty() {
            return Err(ConfigError::Validation(
                "evaluation.primary_model must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> String {
        toml::to_string_pretty(&AppConfig::default()).expect("default config serializes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::CheckpointFormat;
    use std::io::Write;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
[checkpoint]
keep_recent = 3
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.checkpoint.keep_recent, 3);
        assert_eq!(config.checkpoint.checkpoint_dir, PathBuf::from("checkpoints"));
        assert_eq!(config.checkpoint.format, CheckpointFormat::Json);
        assert_eq!(config.evaluation.primary_model, "model");
        assert_eq!(config.evaluation.num_batches, None);
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        let default = AppConfig::default();
        assert_eq!(config.checkpoint.keep_recent, default.checkpoint.keep_recent);
        assert_eq!(config.evaluation.log_interval, default.evaluation.log_interval);
    }

    #[test]
    fn test_validation_rejects_zero_keep_recent() {
        let mut config = AppConfig::default();
        config.checkpoint.keep_recent = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_dir() {
        let mut config = AppConfig::default();
        config.checkpoint.checkpoint_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_num_batches() {
        let mut config = AppConfig::default();
        config.evaluation.num_batches = Some(0);
        assert!(config.validate().is_err());
        config.evaluation.num_batches = Some(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_zero_log_interval() {
        let mut config = AppConfig::default();
        config.evaluation.log_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_primary_model() {
        let mut config = AppConfig::default();
        config.evaluation.primary_model = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.checkpoint.keep_recent, 10);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[checkpoint]
checkpoint_dir = "runs/nmn"
format = "bincode"

[evaluation]
num_batches = 25
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.checkpoint.checkpoint_dir, PathBuf::from("runs/nmn"));
        assert_eq!(config.checkpoint.format, CheckpointFormat::Bincode);
        assert_eq!(config.evaluation.num_batches, Some(25));
        // Others are defaults
        assert_eq!(config.checkpoint.keep_recent, 10);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[checkpoint]\nkeep_recent = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path).unwrap_err(),
            ConfigError::Validation(_)
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
    }
}
