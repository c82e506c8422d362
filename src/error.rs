//! Error types and handling for flux-stream
//!
//! Runtime failures travel through the signal channel of the stream that
//! observed them; the types here are the payloads producers and factories
//! work with.

use std::fmt;

/// Main error type for runtime stream operations
#[derive(Debug, Clone, PartialEq)]
pub enum FluxError {
    /// Operation timed out
    Timeout,
    /// Operation was aborted, with the abort reason
    Aborted(String),
    /// The stream was already disposed
    Disposed,
    /// A producer callback failed
    Callback(String),
    /// Custom error with message
    Custom(String),
}

impl fmt::Display for FluxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FluxError::Timeout => write!(f, "Operation timed out"),
            FluxError::Aborted(reason) => write!(f, "Operation aborted: {}", reason),
            FluxError::Disposed => write!(f, "Stream already disposed"),
            FluxError::Callback(msg) => write!(f, "Producer callback failed: {}", msg),
            FluxError::Custom(msg) => write!(f, "Stream error: {}", msg),
        }
    }
}

impl std::error::Error for FluxError {}

/// Result type for runtime stream operations
pub type FluxResult<T> = Result<T, FluxError>;

/// Errors raised synchronously while building a source, combinator or
/// operator. Nothing here is deferred to the first value.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("interval and manual triggering are mutually exclusive")]
    ConflictingTrigger,
    #[error("selection requires exactly one of `at` or `matching`, both were set")]
    AmbiguousSelection,
    #[error("selection requires one of `at` or `matching`, neither was set")]
    MissingSelection,
    #[error("a fallback value or thunk is required")]
    MissingFallback,
    #[error("at least one input stream is required")]
    NoInputs,
}
