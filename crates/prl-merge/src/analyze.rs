//! Three-way structural merge analysis.

use std::collections::BTreeSet;

use prl_lineage::{Commit, CommitId, LineageStore};
use tracing::info;

use crate::decision::{ConflictKind, MergeAction, MergeConflict, MergeDecision, Proposal};
use crate::error::{MergeError, MergeResult};
use crate::view::{canonical_signature, payload_signature, SubjectView};

const DECISION_NOTE: &str = "structural merge analysis (no semantic resolution); \
     conflicts must be resolved by explicit revision decisions";

/// Compare two heads and propose, per subject, how to merge them.
///
/// Payloads are compared only by canonical form. The base is the common
/// ancestor with the greatest `(timestamp_ms, id)`: a most-recent common
/// ancestor, which is not necessarily a lowest one in graph terms.
pub fn analyze<S: LineageStore + ?Sized>(
    store: &S,
    left: &CommitId,
    right: &CommitId,
) -> MergeResult<MergeDecision> {
    for head in [left, right] {
        if !store.exists(head) {
            return Err(MergeError::UnknownHead(head.clone()));
        }
    }

    let base = pick_base(store, left, right)?;
    let left_view = SubjectView::build(store, left)?;
    let right_view = SubjectView::build(store, right)?;
    let base_view = match &base {
        Some(id) => SubjectView::build(store, id)?,
        None => SubjectView::default(),
    };

    let subjects: BTreeSet<&str> = left_view.subjects().chain(right_view.subjects()).collect();

    let mut actions = Vec::new();
    let mut conflicts = Vec::new();
    for subject in subjects {
        let (l, r) = match (left_view.get(subject), right_view.get(subject)) {
            (Some(l), None) => {
                actions.push(action(
                    subject,
                    Proposal::AcceptLeft,
                    "subject appears only on left branch",
                    None,
                    Some(l),
                    None,
                ));
                continue;
            }
            (None, Some(r)) => {
                actions.push(action(
                    subject,
                    Proposal::AcceptRight,
                    "subject appears only on right branch",
                    None,
                    None,
                    Some(r),
                ));
                continue;
            }
            (Some(l), Some(r)) => (l, r),
            (None, None) => continue,
        };

        let l_sig = canonical_signature(&l.payload);
        let r_sig = canonical_signature(&r.payload);
        if same(&l_sig, &r_sig) {
            actions.push(action(
                subject,
                Proposal::AcceptEither,
                "structurally equivalent payloads",
                None,
                Some(l),
                Some(r),
            ));
            continue;
        }

        let b = base_view.get(subject);
        if let Some(b) = b {
            let b_sig = canonical_signature(&b.payload);
            if same(&l_sig, &b_sig) {
                actions.push(action(
                    subject,
                    Proposal::AcceptRight,
                    "left matches base; right diverges",
                    Some(b),
                    None,
                    Some(r),
                ));
                continue;
            }
            if same(&r_sig, &b_sig) {
                actions.push(action(
                    subject,
                    Proposal::AcceptLeft,
                    "right matches base; left diverges",
                    Some(b),
                    Some(l),
                    None,
                ));
                continue;
            }
        }

        conflicts.push(MergeConflict {
            subject_id: subject.to_owned(),
            kind: ConflictKind::DivergentUpdates,
            reason: "both branches diverged for the same subject; requires an explicit merge decision"
                .to_owned(),
            base_commit: b.map(|b| b.id.clone()),
            left_commit: l.id.clone(),
            right_commit: r.id.clone(),
            left_payload_sig: payload_signature(&l.payload),
            right_payload_sig: payload_signature(&r.payload),
        });
    }

    info!(
        left = %left,
        right = %right,
        base = ?base.as_ref().map(CommitId::as_str),
        actions = actions.len(),
        conflicts = conflicts.len(),
        "merge analysis complete"
    );
    Ok(MergeDecision::new(
        base,
        left.clone(),
        right.clone(),
        actions,
        conflicts,
        DECISION_NOTE,
    ))
}

/// Most recent common ancestor by `(timestamp_ms, id)`.
fn pick_base<S: LineageStore + ?Sized>(
    store: &S,
    left: &CommitId,
    right: &CommitId,
) -> MergeResult<Option<CommitId>> {
    let mut best: Option<&Commit> = None;
    for id in store.lca_candidates(left, right)? {
        let candidate = store.get(&id)?;
        if best.map_or(true, |b| candidate.order_key() > b.order_key()) {
            best = Some(candidate);
        }
    }
    Ok(best.map(|c| c.id.clone()))
}

/// Opaque payloads never match anything, themselves included.
fn same(a: &Option<String>, b: &Option<String>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a == b)
}

fn action(
    subject: &str,
    proposal: Proposal,
    reason: &str,
    base: Option<&Commit>,
    left: Option<&Commit>,
    right: Option<&Commit>,
) -> MergeAction {
    MergeAction {
        subject_id: subject.to_owned(),
        proposal,
        reason: reason.to_owned(),
        base_commit: base.map(|c| c.id.clone()),
        left_commit: left.map(|c| c.id.clone()),
        right_commit: right.map(|c| c.id.clone()),
    }
}
