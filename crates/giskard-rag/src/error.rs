//! Error types for giskard-rag operations
//!
//! Every fallible call in the pipeline surfaces one of the variants below.
//! Use [`Error::category()`] to decide how to react:
//!
//! - [`ErrorCategory::Validation`]: bad input or configuration, not retryable.
//! - [`ErrorCategory::Installation`]: a required backend could not be set up.
//! - [`ErrorCategory::Provider`]: the embedding or completion provider
//!   failed; the core never retries, the message carries the original cause.
//! - [`ErrorCategory::Generation`]: the provider answered but the structured
//!   output was missing the expected fields; aborts the current call.

use thiserror::Error;

/// Result type alias for giskard-rag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error category for systematic error handling and reporting
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Invalid input or configuration (expected errors from bad user input)
    Validation,
    /// A required backend is unavailable or could not be initialized
    Installation,
    /// The embedding or LLM provider failed (network, quota, malformed request)
    Provider,
    /// The provider response could not be parsed into the requested structure
    Generation,
    /// Other/unknown errors
    Unknown,
}

impl ErrorCategory {
    /// Human-readable description of this category
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            ErrorCategory::Validation => "Validation Error",
            ErrorCategory::Installation => "Missing Backend/Dependency",
            ErrorCategory::Provider => "Provider Failure",
            ErrorCategory::Generation => "Malformed Generated Output",
            ErrorCategory::Unknown => "Unknown Error",
        }
    }

    /// Whether the fault lies with an external provider rather than this crate
    #[must_use]
    pub fn is_provider_fault(&self) -> bool {
        matches!(self, ErrorCategory::Provider | ErrorCategory::Generation)
    }
}

/// Errors raised by the knowledge-base and test-set generation pipeline.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (empty knowledge base, duplicate ids, bad parameters).
    ///
    /// Not retryable - fix the input or the builder parameters.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Input validation error at a call site.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required backend (e.g. the vector index) is unavailable.
    ///
    /// Raised lazily on first access, never at construction.
    #[error("Installation error: {0}")]
    Installation(String),

    /// Embedding or completion provider failure, propagated unmodified.
    ///
    /// The core does not retry; the message carries the provider's cause.
    #[error("Provider error: {0}")]
    Provider(String),

    /// The LLM answered but the structured response was missing the
    /// requested fields or was otherwise malformed.
    #[error("Could not parse generated output: {0}")]
    Generation(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while saving or loading a test set.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Feature intentionally not available.
    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create an invalid-input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an installation error
    pub fn installation(msg: impl Into<String>) -> Self {
        Error::Installation(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        Error::Provider(msg.into())
    }

    /// Create a generation-parsing error
    pub fn generation(msg: impl Into<String>) -> Self {
        Error::Generation(msg.into())
    }

    /// Get the category of this error
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Configuration(_) | Error::InvalidInput(_) => ErrorCategory::Validation,
            Error::Installation(_) => ErrorCategory::Installation,
            Error::Provider(_) => ErrorCategory::Provider,
            Error::Generation(_) => ErrorCategory::Generation,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Status line for debugging, prefixed with the category description
    #[must_use]
    pub fn status_message(&self) -> String {
        format!("[{}] {}", self.category().description(), self)
    }
}
