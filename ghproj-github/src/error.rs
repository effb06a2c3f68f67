//! Error types for GitHub operations

use thiserror::Error;

/// Result type for GitHub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during GitHub operations
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the core crate (validation, bundle, cancellation, ...)
    #[error(transparent)]
    Core(#[from] ghproj_core::Error),

    /// Request could not be sent or the server answered with a failure status
    #[error("{operation} failed: {message}")]
    Http { operation: String, message: String },

    /// GraphQL `errors` array in the response
    #[error("{operation} failed: {message}")]
    Query { operation: String, message: String },

    /// Authentication error
    #[error("GitHub authentication error: {0}")]
    Auth(String),

    /// Rate limit exceeded
    #[error("GitHub rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response did not have the expected shape
    #[error("Malformed response for {operation}: {message}")]
    Parse { operation: String, message: String },

    /// Owner could be resolved neither as a user nor as an organization
    #[error("'{owner}' not found for user or organization: {cause}")]
    OwnerNotFound { owner: String, cause: String },

    /// Project could be resolved neither under a user nor under an organization
    #[error("Project {owner}/{number} not found for user or organization: {cause}")]
    ProjectNotFound {
        owner: String,
        number: u64,
        cause: String,
    },

    /// A lookup returned no data
    #[error("{0} not found")]
    NotFound(String),

    /// Import stopped part-way; earlier stages are not rolled back
    #[error("Import stopped during {stage} (project {project_url} was created and is left in place): {source}")]
    PartialImport {
        stage: &'static str,
        project_url: String,
        #[source]
        source: Box<Error>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Wrap an error with the name of the operation that produced it
    pub fn parse(operation: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    /// Whether this error was detected before any network I/O
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Core(e) if e.is_validation())
    }

    /// Whether the operation was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Core(ghproj_core::Error::Cancelled))
    }
}
