//! Error types for merge analysis and merge commits.

use prl_identity::IdentityError;
use prl_lineage::{CommitId, LineageError};

/// Errors that can occur while analyzing or committing a merge.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    /// A head passed to the analyzer is not in the store.
    #[error("merge head not found: {0}")]
    UnknownHead(CommitId),

    /// A parent passed to the committer is not in the store.
    #[error("merge parent not found: {0}")]
    UnknownParent(CommitId),

    /// The decision was produced for different heads than the ones given.
    #[error("decision was made for {decision_left}/{decision_right}, not {left}/{right}")]
    DecisionMismatch {
        decision_left: CommitId,
        decision_right: CommitId,
        left: CommitId,
        right: CommitId,
    },

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

/// Convenience alias for merge results.
pub type MergeResult<T> = Result<T, MergeError>;
