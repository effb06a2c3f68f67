//! Error types for ghproj

use thiserror::Error;

/// Result type alias for ghproj core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for ghproj core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Input rejected before any network call
    #[error("Invalid input: {0}")]
    Validation(String),

    /// A human-entered reference could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Bundle could not be decoded
    #[error("Invalid bundle: {0}")]
    Bundle(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation was cancelled by the user
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error was raised before any network I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Parse(_))
    }
}
