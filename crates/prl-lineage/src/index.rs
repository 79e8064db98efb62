//! In-memory commit index shared by both store implementations.
//!
//! The index holds every commit keyed by id plus a reverse-adjacency map
//! (parent -> children). Appends happen in two steps: [`LineageIndex::prepare`]
//! validates a request and materializes the commit without touching the
//! index, and [`LineageIndex::insert`] links it in. The file store writes the
//! log record between the two, so a failed write leaves the index unchanged.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::clock::{next_timestamp, IdMode};
use crate::commit::{Commit, CommitId, CommitRequest};
use crate::error::{LineageError, LineageResult};

#[derive(Clone, Debug, Default)]
pub struct LineageIndex {
    commits: HashMap<CommitId, Commit>,
    children: HashMap<CommitId, BTreeSet<CommitId>>,
    /// Commit ids in append order.
    order: Vec<CommitId>,
    last_timestamp: Option<u64>,
    id_mode: IdMode,
}

impl LineageIndex {
    pub fn new(id_mode: IdMode) -> Self {
        Self {
            id_mode,
            ..Self::default()
        }
    }

    pub fn id_mode(&self) -> IdMode {
        self.id_mode
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    /// Validate a request and build the commit it would create.
    pub fn prepare(&self, request: CommitRequest) -> LineageResult<Commit> {
        self.check_parents(&request.parents)?;
        let CommitRequest {
            parents,
            operation,
            subject,
            payload,
            note,
        } = request;
        Ok(Commit {
            id: self.id_mode.allocate(self.commits.len() + 1),
            timestamp_ms: next_timestamp(self.last_timestamp),
            parents,
            operation,
            subject,
            payload,
            note,
        })
    }

    /// Link a commit into the index. Parents must already be present.
    pub fn insert(&mut self, commit: Commit) -> LineageResult<()> {
        self.check_parents(&commit.parents)?;
        for parent in &commit.parents {
            self.children
                .entry(parent.clone())
                .or_default()
                .insert(commit.id.clone());
        }
        self.children.entry(commit.id.clone()).or_default();
        self.last_timestamp = Some(
            self.last_timestamp
                .map_or(commit.timestamp_ms, |t| t.max(commit.timestamp_ms)),
        );
        debug!(
            commit = %commit.id,
            op = %commit.operation,
            parents = commit.parents.len(),
            "appended commit"
        );
        self.order.push(commit.id.clone());
        self.commits.insert(commit.id.clone(), commit);
        Ok(())
    }

    fn check_parents(&self, parents: &[CommitId]) -> LineageResult<()> {
        let mut seen = BTreeSet::new();
        for parent in parents {
            if !self.commits.contains_key(parent) {
                return Err(LineageError::UnknownParent(parent.clone()));
            }
            if !seen.insert(parent) {
                return Err(LineageError::DuplicateParent(parent.clone()));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &CommitId) -> LineageResult<&Commit> {
        self.commits
            .get(id)
            .ok_or_else(|| LineageError::UnknownCommit(id.clone()))
    }

    pub fn exists(&self, id: &CommitId) -> bool {
        self.commits.contains_key(id)
    }

    /// All commits ordered by `(timestamp_ms, id)`.
    pub fn all_commits(&self) -> Vec<&Commit> {
        let mut all: Vec<&Commit> = self
            .order
            .iter()
            .filter_map(|id| self.commits.get(id))
            .collect();
        all.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
        all
    }

    pub fn children_of(&self, id: &CommitId) -> BTreeSet<CommitId> {
        self.children.get(id).cloned().unwrap_or_default()
    }
}
