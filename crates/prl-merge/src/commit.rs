//! Recording an externally resolved merge.

use std::collections::BTreeMap;

use prl_canon::Value;
use prl_identity::{IdentityAnchor, DEFAULT_SCOPE};
use prl_lineage::{Commit, CommitId, CommitRequest, LineageStore, Operation, Subject};
use tracing::info;

use crate::decision::MergeDecision;
use crate::error::{MergeError, MergeResult};

/// Identity metadata the resolved payloads are anchored under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeIdentity {
    /// Kind the resolved payloads are anchored under.
    pub kind: String,
    /// Namespace the resolved payloads are anchored under.
    pub namespace: String,
    pub scope: String,
}

impl MergeIdentity {
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            scope: scope.into(),
        }
    }

    pub fn global(kind: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(kind, namespace, DEFAULT_SCOPE)
    }
}

/// Append one commit per resolved subject, each with both heads as parents.
///
/// `resolutions` maps a subject id to the payload the caller chose for it.
/// The anchor of every payload is recomputed first. When it reproduces the
/// subject id the commit is a `merge` under that id; otherwise the identity
/// drifted and the commit is a `replace` under the new id. All anchors are
/// derived before anything is appended, so an identity failure creates no
/// commits. Commits are appended in ascending subject-id order.
pub fn commit_merge<S: LineageStore + ?Sized>(
    store: &mut S,
    parents: (&CommitId, &CommitId),
    decision: &MergeDecision,
    resolutions: &BTreeMap<String, Value>,
    identity: &MergeIdentity,
    note: &str,
) -> MergeResult<Vec<Commit>> {
    let (left, right) = parents;
    for parent in [left, right] {
        if !store.exists(parent) {
            return Err(MergeError::UnknownParent(parent.clone()));
        }
    }
    if decision.left() != left || decision.right() != right {
        return Err(MergeError::DecisionMismatch {
            decision_left: decision.left().clone(),
            decision_right: decision.right().clone(),
            left: left.clone(),
            right: right.clone(),
        });
    }

    let mut planned = Vec::with_capacity(resolutions.len());
    for (subject_id, payload) in resolutions {
        let anchor = IdentityAnchor::create(
            identity.kind.as_str(),
            identity.namespace.as_str(),
            identity.scope.as_str(),
            payload,
        )?;
        let operation = if anchor.id() == subject_id {
            Operation::Merge
        } else {
            Operation::Replace
        };
        planned.push((operation, Subject::from(&anchor), payload.clone()));
    }

    let mut created = Vec::with_capacity(planned.len());
    for (operation, subject, payload) in planned {
        let request = CommitRequest::new(operation, subject, payload)
            .with_parents([left.clone(), right.clone()])
            .with_note(note);
        created.push(store.append(request)?);
    }

    info!(
        left = %left,
        right = %right,
        commits = created.len(),
        replaced = created.iter().filter(|c| c.operation == Operation::Replace).count(),
        "merge committed"
    );
    Ok(created)
}
