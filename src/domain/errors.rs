//! Domain errors for the Quarry knowledge engine.

use thiserror::Error;

/// Engine-level errors that can occur across ingestion and retrieval.
///
/// The taxonomy matters for retry behavior: `Validation` is never retried,
/// `Provider` is retried and then falls back to the embedding cache,
/// `Storage` fails a single file without aborting a batch.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Embedding provider '{provider}' failed after {attempts} attempt(s): {message}")]
    Provider {
        provider: String,
        attempts: u32,
        message: String,
    },

    #[error("Chunking failed for {file_path}: {reason}")]
    Chunking { file_path: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl EngineError {
    /// Transient failures are worth retrying; validation and configuration
    /// mistakes are not.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Provider { .. } | Self::Storage(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_provider_and_attempts() {
        let err = EngineError::Provider {
            provider: "openai".to_string(),
            attempts: 3,
            message: "connection reset".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("openai"));
        assert!(rendered.contains('3'));
    }

    #[test]
    fn validation_is_not_retryable() {
        assert!(!EngineError::Validation("empty text".to_string()).is_retryable());
        assert!(EngineError::Provider {
            provider: "ollama".to_string(),
            attempts: 1,
            message: "timeout".to_string(),
        }
        .is_retryable());
    }
}
