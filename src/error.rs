use thiserror::Error;

/// Main error type for leafdex operations
#[derive(Error, Debug)]
pub enum LeafdexError {
    #[error("Corrupted: lengths mismatch: {decoded} > {expected} (resource={resource})")]
    LengthMismatch {
        decoded: usize,
        expected: usize,
        resource: String,
    },

    #[error("Corrupted: {reason} (resource={resource})")]
    Corruption { reason: String, resource: String },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Index error: {0}")]
    IndexError(String),
}

/// Result type alias for leafdex operations
pub type Result<T> = std::result::Result<T, LeafdexError>;

impl LeafdexError {
    pub fn corruption(reason: impl Into<String>, resource: impl Into<String>) -> Self {
        LeafdexError::Corruption {
            reason: reason.into(),
            resource: resource.into(),
        }
    }

    /// Check if this error reports damaged or mismatched persisted data
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            LeafdexError::LengthMismatch { .. } | LeafdexError::Corruption { .. }
        )
    }

    /// Check if reading the same data again (e.g. from a replica) could succeed
    pub fn is_retriable(&self) -> bool {
        self.is_corruption() || matches!(self, LeafdexError::Io(_))
    }
}
