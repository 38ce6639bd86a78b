use std::path::PathBuf;

/// Boxed error returned by caller-implemented model hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no checkpoints found in {0}")]
    NoCheckpoints(PathBuf),

    #[error("failed to read checkpoint {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode checkpoint {path}: {source}")]
    Decode { path: PathBuf, source: BoxError },

    #[error("failed to encode checkpoint: {0}")]
    Encode(#[source] BoxError),

    #[error("unrecognized checkpoint extension: {0}")]
    UnknownFormat(PathBuf),

    #[error("invalid state dict: {0}")]
    StateDict(String),

    #[error("module record error: {0}")]
    ModuleRecord(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur during evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("model '{0}' is not registered")]
    MissingModel(String),

    #[error("forward pass failed for '{model}': {source}")]
    Forward { model: String, source: BoxError },

    #[error("evaluation step failed: {0}")]
    Step(String),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_display() {
        let err = CheckpointError::NoCheckpoints(PathBuf::from("checkpoints"));
        assert_eq!(err.to_string(), "no checkpoints found in checkpoints");
    }

    #[test]
    fn test_eval_error_display() {
        let err = EvalError::Forward {
            model: "program_generator".to_string(),
            source: "shape mismatch".into(),
        };
        assert_eq!(
            err.to_string(),
            "forward pass failed for 'program_generator': shape mismatch"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Validation("keep_recent must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "config validation error: keep_recent must be >= 1"
        );
    }
}
