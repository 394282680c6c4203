//! Error types for the Recall core.

/// Core error type for Recall infrastructure.
#[derive(Debug, thiserror::Error)]
pub enum RecallError {
    /// An environment variable held a value that could not be parsed.
    #[error("invalid value for {name}: {value:?}")]
    InvalidEnvValue {
        /// Name of the offending variable.
        name: String,
        /// The raw value that failed to parse.
        value: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result type for Recall operations.
pub type RecallResult<T> = Result<T, RecallError>;
