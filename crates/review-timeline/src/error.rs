//! Error types for review-timeline

use thiserror::Error;

use crate::model::{UpdateId, UpdateKind};

/// Result type alias for review-timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;

/// Main error type for review-timeline operations
#[derive(Error, Debug)]
pub enum TimelineError {
    /// Repository collaborator errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Snapshot file access
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Errors reported by an [`UpdateRepository`](crate::repository::UpdateRepository).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// The requested record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The repository could not be reached or did not answer
    #[error("repository unavailable: {0}")]
    Unavailable(String),

    /// The repository refused the operation
    #[error("rejected by repository: {0}")]
    Rejected(String),
}

impl RepositoryError {
    /// Not-found results are stable; anything else may succeed on retry.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound(_))
    }
}

/// Errors returned when deleting an update from a feed.
///
/// All variants are recoverable: the feed is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeleteError {
    /// The update is not (or no longer) part of the feed
    #[error("{kind} update {id} is not in the timeline")]
    NotInFeed { kind: UpdateKind, id: UpdateId },

    /// The viewer may not delete this update at this time
    #[error("not permitted to delete {kind} update {id}")]
    NotPermitted { kind: UpdateKind, id: UpdateId },

    /// The repository reported a failure
    #[error("repository failed to delete update: {0}")]
    Repository(#[from] RepositoryError),
}

/// Failure of a single clipboard layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    /// The mechanism does not exist on this platform
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),

    /// The mechanism exists but refused the write
    #[error("clipboard write rejected: {0}")]
    Rejected(String),
}

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid value: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_failures_convert() {
        let err: TimelineError = RepositoryError::Unavailable("offline".to_string()).into();
        assert!(matches!(err, TimelineError::Repository(_)));

        let err: TimelineError = serde_json::from_str::<u8>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("Snapshot error"));
    }
}
