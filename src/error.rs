use thiserror::Error;

/// Unified error type for git-batch-push operations
#[derive(Error, Debug)]
pub enum BatchPushError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("Push of '{refspec}' to '{remote}' failed: {message}")]
    Push {
        remote: String,
        refspec: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-batch-push
pub type Result<T> = std::result::Result<T, BatchPushError>;

impl BatchPushError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        BatchPushError::Config(msg.into())
    }

    /// Create a branch error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        BatchPushError::Branch(msg.into())
    }

    /// Create a push error for a refspec sent to a remote
    pub fn push(
        remote: impl Into<String>,
        refspec: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        BatchPushError::Push {
            remote: remote.into(),
            refspec: refspec.into(),
            message: message.into(),
        }
    }
}
