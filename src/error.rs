//! Classified error types for revtrack operations.

use thiserror::Error;

/// Failures that callers need to tell apart.
///
/// These are raised inside functions returning [`crate::Result`] and travel
/// inside the eyre report; use `report.downcast_ref::<RevtrackError>()` to
/// inspect them.
#[derive(Error, Debug)]
pub enum RevtrackError {
    // Cli args errors
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("sha number {value} is {len} not 40")]
    InvalidRevision { value: String, len: usize },

    // Source host errors
    #[error("Unsupported repository host in uri: {0}")]
    UnsupportedHost(String),

    #[error("No access token configured for {host}: set {env_var}")]
    MissingToken { host: String, env_var: String },

    #[error("Source host operation failed: {0}")]
    ForgeError(String),

    #[error("Source host API rate limit exceeded")]
    RateLimitExceeded,

    // External command errors
    #[error("`{program} {args}` exited with status {status}: {output}")]
    CommandFailed {
        program: String,
        args: String,
        status: i32,
        output: String,
    },
}

impl RevtrackError {
    /// Create a source host error with context
    pub fn forge(msg: impl Into<String>) -> Self {
        Self::ForgeError(msg.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for RevtrackError {
    fn from(err: octocrab::Error) -> Self {
        match &err {
            octocrab::Error::GitHub { source, .. }
                if source.message.contains("rate limit") =>
            {
                Self::RateLimitExceeded
            }
            _ => Self::ForgeError(format!("GitHub API error: {}", err)),
        }
    }
}
