//! Commit records and the request used to create them.

use std::fmt;

use prl_canon::Value;
use prl_identity::{IdentityAnchor, DEFAULT_SCOPE};
use serde::{Deserialize, Serialize};

/// Store-assigned commit identifier.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(String);

impl CommitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First eight characters, for log lines and tables.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Debug for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommitId({})", self.0)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommitId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for CommitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The kind of change a commit records.
///
/// Only `Add`, `Replace` and `Merge` carry semantics in the lineage core;
/// the remaining kinds are recorded as-is for higher layers to interpret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A subject is born.
    Add,
    /// A subject's payload is superseded.
    Replace,
    /// Marks a subject as forgotten. Not enforced.
    Forget,
    /// Joins branches under an unchanged subject id.
    Merge,
    /// A named point in history, e.g. a genesis.
    Milestone,
    /// Records that information was lost.
    LossMarker,
    /// Records that history was replayed.
    ReplayMarker,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Self::Add,
        Self::Replace,
        Self::Forget,
        Self::Merge,
        Self::Milestone,
        Self::LossMarker,
        Self::ReplayMarker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Replace => "replace",
            Self::Forget => "forget",
            Self::Merge => "merge",
            Self::Milestone => "milestone",
            Self::LossMarker => "loss_marker",
            Self::ReplayMarker => "replay_marker",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| format!("unknown operation: {s}"))
    }
}

/// Identity metadata of the entity a commit revises.
///
/// Usually built from an [`IdentityAnchor`], but the store never checks that
/// `id` is a fingerprint of the payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    /// Stable subject id, normally an anchor fingerprint.
    pub id: String,
    /// Entity kind, e.g. `motif`.
    pub kind: String,
    pub namespace: String,
    pub scope: String,
}

impl Subject {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            namespace: namespace.into(),
            scope: scope.into(),
        }
    }

    /// A subject in the default scope.
    pub fn global(id: impl Into<String>, kind: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self::new(id, kind, namespace, DEFAULT_SCOPE)
    }
}

impl From<&IdentityAnchor> for Subject {
    fn from(anchor: &IdentityAnchor) -> Self {
        Self::new(anchor.id(), anchor.kind(), anchor.namespace(), anchor.scope())
    }
}

/// An immutable lineage record.
///
/// Created only by [`LineageStore::append`](crate::LineageStore::append);
/// stores hand out shared references, never mutable ones.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commit {
    /// Store-assigned id.
    pub id: CommitId,
    /// Milliseconds since the UNIX epoch, strictly increasing per store.
    pub timestamp_ms: u64,
    /// 0 parents for genesis, 1 for a revision, 2+ for a merge.
    pub parents: Vec<CommitId>,
    pub operation: Operation,
    /// The entity this commit revises.
    pub subject: Subject,
    /// Opaque to the store; only ever compared by canonical form.
    pub payload: Value,
    /// Free-form description.
    pub note: String,
}

impl Commit {
    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Sort key used by `all_commits` and merge base selection.
    pub fn order_key(&self) -> (u64, &CommitId) {
        (self.timestamp_ms, &self.id)
    }

    /// One-line human-readable summary.
    pub fn summary(&self) -> String {
        let parents = if self.parents.is_empty() {
            "-".to_owned()
        } else {
            self.parents
                .iter()
                .map(|p| p.short().to_owned())
                .collect::<Vec<_>>()
                .join(",")
        };
        format!(
            "{} op={:<13} subject={} parents={} note={}",
            self.id.short(),
            self.operation.as_str(),
            self.subject.id.get(..12).unwrap_or(&self.subject.id),
            parents,
            self.note
        )
    }
}

/// Everything a caller supplies to create a commit.
///
/// The store assigns the id and timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitRequest {
    /// Must already exist in the store, without repeats.
    pub parents: Vec<CommitId>,
    pub operation: Operation,
    pub subject: Subject,
    pub payload: Value,
    /// Defaults to empty.
    pub note: String,
}

impl CommitRequest {
    pub fn new(operation: Operation, subject: Subject, payload: Value) -> Self {
        Self {
            parents: Vec::new(),
            operation,
            subject,
            payload,
            note: String::new(),
        }
    }

    pub fn with_parents(mut self, parents: impl IntoIterator<Item = CommitId>) -> Self {
        self.parents = parents.into_iter().collect();
        self
    }

    pub fn with_parent(mut self, parent: CommitId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}
