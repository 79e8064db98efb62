//! The merge decision artifact.
//!
//! A decision is never applied implicitly. Every entry names the subject,
//! what is proposed or why it conflicts, and the commits that support it, so
//! a reviewer can audit or override it.

use std::collections::BTreeMap;
use std::fmt;

use prl_canon::Value;
use prl_lineage::{CommitId, LineageStore};
use serde::{Deserialize, Serialize};

use crate::error::MergeResult;

/// A non-binding proposal for one subject.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proposal {
    /// Take the left branch's payload.
    AcceptLeft,
    /// Take the right branch's payload.
    AcceptRight,
    /// Both sides carry the same canonical payload.
    AcceptEither,
}

impl Proposal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AcceptLeft => "accept_left",
            Self::AcceptRight => "accept_right",
            Self::AcceptEither => "accept_either",
        }
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a subject could not be given a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Both branches changed the subject, differently.
    DivergentUpdates,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivergentUpdates => f.write_str("divergent_updates"),
        }
    }
}

/// A subject the analyzer could settle without outside input.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeAction {
    /// Subject the proposal applies to.
    pub subject_id: String,
    pub proposal: Proposal,
    /// Human-readable classification, e.g. "right matches base; left diverges".
    pub reason: String,
    /// Base commit for the subject, when the proposal relied on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_commit: Option<CommitId>,
    /// Latest left-branch commit for the subject, if it supports the proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_commit: Option<CommitId>,
    /// Latest right-branch commit for the subject, if it supports the proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_commit: Option<CommitId>,
}

impl MergeAction {
    /// The commit whose payload the proposal points at. `AcceptEither`
    /// prefers the left side.
    pub fn proposed_commit(&self) -> Option<&CommitId> {
        match self.proposal {
            Proposal::AcceptLeft => self.left_commit.as_ref(),
            Proposal::AcceptRight => self.right_commit.as_ref(),
            Proposal::AcceptEither => self.left_commit.as_ref().or(self.right_commit.as_ref()),
        }
    }
}

/// A subject that needs an explicit resolution before merging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConflict {
    /// Subject both branches changed.
    pub subject_id: String,
    pub kind: ConflictKind,
    pub reason: String,
    /// Base commit for the subject; `None` when the base never saw it.
    pub base_commit: Option<CommitId>,
    /// Latest commit for the subject on the left branch.
    pub left_commit: CommitId,
    /// Latest commit for the subject on the right branch.
    pub right_commit: CommitId,
    /// Canonical form of the left payload, or `<opaque-payload>`.
    pub left_payload_sig: String,
    /// Canonical form of the right payload, or `<opaque-payload>`.
    pub right_payload_sig: String,
}

/// Output of [`analyze`](crate::analyze). Read-only once built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeDecision {
    base: Option<CommitId>,
    left: CommitId,
    right: CommitId,
    actions: Vec<MergeAction>,
    conflicts: Vec<MergeConflict>,
    note: String,
}

impl MergeDecision {
    pub(crate) fn new(
        base: Option<CommitId>,
        left: CommitId,
        right: CommitId,
        actions: Vec<MergeAction>,
        conflicts: Vec<MergeConflict>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            base,
            left,
            right,
            actions,
            conflicts,
            note: note.into(),
        }
    }

    pub fn base(&self) -> Option<&CommitId> {
        self.base.as_ref()
    }

    pub fn left(&self) -> &CommitId {
        &self.left
    }

    pub fn right(&self) -> &CommitId {
        &self.right
    }

    pub fn actions(&self) -> &[MergeAction] {
        &self.actions
    }

    pub fn conflicts(&self) -> &[MergeConflict] {
        &self.conflicts
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    /// `true` when nothing needs an explicit decision.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn action_for(&self, subject_id: &str) -> Option<&MergeAction> {
        self.actions.iter().find(|a| a.subject_id == subject_id)
    }

    pub fn conflict_for(&self, subject_id: &str) -> Option<&MergeConflict> {
        self.conflicts.iter().find(|c| c.subject_id == subject_id)
    }

    /// Look up the payload each action points at.
    ///
    /// This only dereferences proposals; conflicts are left out and must be
    /// added by the caller before committing.
    pub fn proposed_payloads<S: LineageStore + ?Sized>(
        &self,
        store: &S,
    ) -> MergeResult<BTreeMap<String, Value>> {
        let mut out = BTreeMap::new();
        for action in &self.actions {
            if let Some(id) = action.proposed_commit() {
                out.insert(action.subject_id.clone(), store.get(id)?.payload.clone());
            }
        }
        Ok(out)
    }
}
