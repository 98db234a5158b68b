//! Error types for the snapshot service

use thiserror::Error;

/// Result type alias for render host operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while hosting the scene or running a render invocation
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to start the browser or its tab
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load the scene page
    #[error("Failed to load scene: {0}")]
    LoadError(String),

    /// The invocation could not be delivered to or read back from the page
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// The scene's render promise rejected; carries the stringified reason as-is
    #[error("{0}")]
    Rejected(String),

    /// The resolved value was not a base64 data URI
    #[error("malformed render result")]
    MalformedResult,

    /// Operation timed out
    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// A query string that cannot be turned into a viewpoint (client fault, HTTP 400)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One or more of `lat`, `lon`, `alt` is absent or not a finite number
    #[error("Invalid request: Required parameters are missing or invalid: {}", .0.join(", "))]
    MissingOrInvalidRequired(Vec<&'static str>),
}
