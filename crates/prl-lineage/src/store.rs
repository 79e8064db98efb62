//! The lineage store boundary.

use std::collections::{BTreeSet, VecDeque};

use crate::commit::{Commit, CommitId, CommitRequest};
use crate::error::LineageResult;

/// Append-only store of immutable commits.
///
/// `append` is the only operation that creates commits; nothing mutates or
/// removes one afterwards. Implementations must make `append` atomic: either
/// the commit and all of its parent edges exist afterwards, or the store is
/// exactly as it was.
pub trait LineageStore {
    /// Create a commit. Fails on unknown or duplicate parents.
    fn append(&mut self, request: CommitRequest) -> LineageResult<Commit>;

    /// Look up a commit. Fails on unknown ids.
    fn get(&self, id: &CommitId) -> LineageResult<&Commit>;

    fn exists(&self, id: &CommitId) -> bool;

    /// Every commit, ordered by `(timestamp_ms, id)` ascending.
    fn all_commits(&self) -> Vec<&Commit>;

    /// Direct children. Empty for leaves and unknown ids.
    fn children_of(&self, id: &CommitId) -> BTreeSet<CommitId>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transitive closure over parent edges, excluding `id` itself.
    fn ancestors_of(&self, id: &CommitId) -> LineageResult<BTreeSet<CommitId>> {
        let start = self.get(id)?;
        let mut visited = BTreeSet::new();
        let mut queue: VecDeque<&CommitId> = start.parents.iter().collect();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            for parent in &self.get(current)?.parents {
                if !visited.contains(parent) {
                    queue.push_back(parent);
                }
            }
        }
        Ok(visited)
    }

    /// Every common ancestor of `a` and `b`, each counted as its own
    /// ancestor. Not reduced to a lowest point.
    fn lca_candidates(&self, a: &CommitId, b: &CommitId) -> LineageResult<BTreeSet<CommitId>> {
        let mut left = self.ancestors_of(a)?;
        left.insert(a.clone());
        let mut right = self.ancestors_of(b)?;
        right.insert(b.clone());
        Ok(left.intersection(&right).cloned().collect())
    }

    /// Genesis commits, in `(timestamp_ms, id)` order.
    fn roots(&self) -> Vec<&Commit> {
        self.all_commits()
            .into_iter()
            .filter(|c| c.is_genesis())
            .collect()
    }

    /// Commits with no children, in `(timestamp_ms, id)` order.
    fn heads(&self) -> Vec<&Commit> {
        self.all_commits()
            .into_iter()
            .filter(|c| self.children_of(&c.id).is_empty())
            .collect()
    }
}
