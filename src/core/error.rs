//! Custom error types for Ragent
//!
//! Provides a unified error handling system across all modules.
//! Capability failures never show up here: they are carried as
//! [`CapabilityOutput::Error`](crate::tools::CapabilityOutput) values and fed
//! back to the model instead.

use thiserror::Error;

/// Main error type for Ragent operations
#[derive(Error, Debug)]
pub enum RagentError {
    /// Language-model API errors (unreachable, bad status, bad payload)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Errors raised while building or talking to a capability backend
    #[error("Capability error: {0}")]
    Capability(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller supplied input that cannot be processed
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Ragent operations
pub type Result<T> = std::result::Result<T, RagentError>;

impl RagentError {
    /// Create an LLM error
    pub fn llm(msg: impl Into<String>) -> Self {
        Self::Llm(msg.into())
    }

    /// Create a capability error
    pub fn capability(msg: impl Into<String>) -> Self {
        Self::Capability(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap an error with additional context
    pub fn with_context<E>(context: impl Into<String>, error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::WithContext {
            context: context.into(),
            source: Box::new(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            RagentError::llm("connection refused").to_string(),
            "LLM error: connection refused"
        );
        assert_eq!(
            RagentError::invalid_input("question is empty").to_string(),
            "Invalid input: question is empty"
        );
    }

    #[test]
    fn test_with_context() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = RagentError::with_context("reading config", io);
        assert_eq!(err.to_string(), "reading config: missing");
    }
}
