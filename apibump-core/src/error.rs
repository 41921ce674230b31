//! Error types for the apibump core library.

/// Top-level error enum for the apibump core library.
///
/// Every variant is a deterministic configuration or environment failure.
/// None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Analyser '{name}' is already registered")]
    RegistrationConflict { name: String },

    #[error("Analyser '{name}' is not registered")]
    AnalyserNotFound { name: String },

    #[error("Cannot resolve snapshot '{reference}': {message}")]
    Snapshot { reference: String, message: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Unknown change kind: {0}")]
    UnknownChangeKind(String),

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    pub(crate) fn snapshot(reference: &str, message: impl Into<String>) -> Self {
        CoreError::Snapshot {
            reference: reference.to_string(),
            message: message.into(),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
