//! Error types for the lineage store.

use crate::commit::CommitId;

/// Errors that can occur during lineage operations.
#[derive(Debug, thiserror::Error)]
pub enum LineageError {
    /// A looked-up commit does not exist.
    #[error("unknown commit: {0}")]
    UnknownCommit(CommitId),

    /// An append referenced a parent that does not exist.
    #[error("unknown parent commit: {0}")]
    UnknownParent(CommitId),

    /// An append listed the same parent twice.
    #[error("duplicate parent commit: {0}")]
    DuplicateParent(CommitId),

    /// Storage I/O error.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The log file contains a damaged record that is not a torn tail.
    #[error("corrupt lineage log at offset {offset}: {reason}")]
    Corrupt { offset: u64, reason: String },

    /// A failed append could not be rolled back, so the file no longer
    /// matches the in-memory lineage. The store must be reopened.
    #[error("lineage log is unwritable: {0}")]
    Unwritable(String),
}

/// Convenience alias for lineage results.
pub type LineageResult<T> = Result<T, LineageError>;
