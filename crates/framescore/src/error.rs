//! Error types.

use crate::model::JobState;
use crate::store::Key;

/// Errors raised while validating, adapting or scoring.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("Validation set has no columns in common with the training set")]
    NoCommonColumns,

    #[error("Validation set has categorical column {column} which is real-valued in the training data")]
    TypeMismatch { column: String },

    #[error("invalid training configuration: {}", .messages.join("; "))]
    InvalidParameters { messages: Vec<String> },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("unknown frame: {0}")]
    UnknownFrame(Key),

    #[error("unknown metrics: {0}")]
    UnknownMetrics(Key),

    #[error("frame {frame} is read-locked by {readers} job(s)")]
    Locked { frame: Key, readers: usize },

    #[error("job {job} was cancelled")]
    Cancelled { job: Key },

    #[error("job {job} cannot move from {from:?} to {to:?}")]
    InvalidTransition { job: Key, from: JobState, to: JobState },

    #[error("inconsistent number of rows: column {column} expected {expected}, got {got}")]
    InconsistentRows {
        column: String,
        expected: usize,
        got: usize,
    },

    #[error("expected {expected} feature values, got {got}")]
    FeatureCount { expected: usize, got: usize },

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A key field was set to an empty string.
    #[error("{field} must not be empty")]
    EmptyKey { field: &'static str },

    /// An ignored column name was empty.
    #[error("ignored_columns must not contain empty names")]
    EmptyColumnName,

    /// The threshold override list was empty.
    #[error("thresholds must not be empty")]
    EmptyThresholds,

    /// A threshold fell outside [0, 1].
    #[error("threshold must be in [0, 1], got {0}")]
    InvalidThreshold(f32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_adapter_wording() {
        assert_eq!(
            ScoreError::NoCommonColumns.to_string(),
            "Validation set has no columns in common with the training set"
        );
        let err = ScoreError::TypeMismatch {
            column: "color".into(),
        };
        assert!(err.to_string().contains("categorical column color"));
    }

    #[test]
    fn invalid_parameters_joins_messages() {
        let err = ScoreError::InvalidParameters {
            messages: vec!["a".into(), "b".into()],
        };
        assert_eq!(err.to_string(), "invalid training configuration: a; b");
    }

    #[test]
    fn config_error_converts() {
        let err: ScoreError = ConfigError::InvalidThreshold(1.5).into();
        assert!(matches!(err, ScoreError::Config(ConfigError::InvalidThreshold(_))));
    }
}
