//! Merge analysis for the Persistent Reasoning Lineage (PRL).
//!
//! Merging is a governance step, not an inference step. [`analyze`] compares
//! two heads structurally against a common base and produces a
//! [`MergeDecision`]: safe proposals plus conflicts that need an explicit
//! choice. Nothing is resolved automatically. Once a caller has decided,
//! [`commit_merge`] records the chosen payloads as new commits with both
//! heads as parents.

pub mod analyze;
pub mod commit;
pub mod decision;
pub mod error;
pub mod view;

pub use analyze::analyze;
pub use commit::{commit_merge, MergeIdentity};
pub use decision::{ConflictKind, MergeAction, MergeConflict, MergeDecision, Proposal};
pub use error::{MergeError, MergeResult};
pub use view::{payload_signature, SubjectView, OPAQUE_PAYLOAD};
