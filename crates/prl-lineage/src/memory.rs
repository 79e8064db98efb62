//! Process-local lineage store.

use std::collections::BTreeSet;

use crate::clock::IdMode;
use crate::commit::{Commit, CommitId, CommitRequest};
use crate::error::LineageResult;
use crate::index::LineageIndex;
use crate::store::LineageStore;

/// In-memory [`LineageStore`]. Contents live as long as the value does.
#[derive(Clone, Debug, Default)]
pub struct InMemoryLineageStore {
    index: LineageIndex,
}

impl InMemoryLineageStore {
    /// Empty store allocating UUID v7 commit ids.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_mode(id_mode: IdMode) -> Self {
        Self {
            index: LineageIndex::new(id_mode),
        }
    }

    /// Empty store with reproducible `c000000000001`-style ids.
    pub fn sequential() -> Self {
        Self::with_id_mode(IdMode::Sequential)
    }

    pub fn id_mode(&self) -> IdMode {
        self.index.id_mode()
    }
}

impl LineageStore for InMemoryLineageStore {
    fn append(&mut self, request: CommitRequest) -> LineageResult<Commit> {
        let commit = self.index.prepare(request)?;
        self.index.insert(commit.clone())?;
        Ok(commit)
    }

    fn get(&self, id: &CommitId) -> LineageResult<&Commit> {
        self.index.get(id)
    }

    fn exists(&self, id: &CommitId) -> bool {
        self.index.exists(id)
    }

    fn all_commits(&self) -> Vec<&Commit> {
        self.index.all_commits()
    }

    fn children_of(&self, id: &CommitId) -> BTreeSet<CommitId> {
        self.index.children_of(id)
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{Operation, Subject};
    use crate::error::LineageError;
    use prl_canon::Value;

    fn request(subject: &str, parents: &[&CommitId]) -> CommitRequest {
        CommitRequest::new(
            Operation::Add,
            Subject::global(subject, "motif", "test"),
            Value::map([("statement", subject)]),
        )
        .with_parents(parents.iter().map(|p| (*p).clone()))
    }

    /// G -> {A, B} -> M
    fn diamond() -> (InMemoryLineageStore, [CommitId; 4]) {
        let mut store = InMemoryLineageStore::sequential();
        let g = store.append(request("g", &[])).unwrap().id;
        let a = store.append(request("a", &[&g])).unwrap().id;
        let b = store.append(request("b", &[&g])).unwrap().id;
        let m = store.append(request("m", &[&a, &b])).unwrap().id;
        (store, [g, a, b, m])
    }

    #[test]
    fn append_assigns_sequential_ids_and_increasing_timestamps() {
        let (store, [g, a, b, m]) = diamond();
        assert_eq!(g.as_str(), "c000000000001");
        assert_eq!(m.as_str(), "c000000000004");
        let ts: Vec<u64> = [&g, &a, &b, &m]
            .iter()
            .map(|id| store.get(id).unwrap().timestamp_ms)
            .collect();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn diamond_ancestry() {
        let (store, [g, a, b, m]) = diamond();
        let expected: BTreeSet<CommitId> = BTreeSet::from([g.clone(), a.clone(), b.clone()]);
        assert_eq!(store.ancestors_of(&m).unwrap(), expected);
        assert!(store.ancestors_of(&g).unwrap().is_empty());
        assert_eq!(store.ancestors_of(&a).unwrap(), BTreeSet::from([g]));
    }

    #[test]
    fn ancestors_of_unknown_fails() {
        let (store, _) = diamond();
        assert!(matches!(
            store.ancestors_of(&CommitId::from("nope")),
            Err(LineageError::UnknownCommit(_))
        ));
    }

    #[test]
    fn lca_candidates_are_symmetric() {
        let (store, ids) = diamond();
        for x in &ids {
            for y in &ids {
                assert_eq!(
                    store.lca_candidates(x, y).unwrap(),
                    store.lca_candidates(y, x).unwrap()
                );
            }
        }
        let [g, a, b, m] = ids;
        assert_eq!(store.lca_candidates(&a, &b).unwrap(), BTreeSet::from([g.clone()]));
        assert_eq!(
            store.lca_candidates(&a, &m).unwrap(),
            BTreeSet::from([g, a.clone()]),
            "a head is its own common ancestor"
        );
        assert_eq!(store.lca_candidates(&m, &m).unwrap().len(), 4);
    }

    #[test]
    fn lca_of_disjoint_roots_is_empty() {
        let mut store = InMemoryLineageStore::sequential();
        let x = store.append(request("x", &[])).unwrap().id;
        let y = store.append(request("y", &[])).unwrap().id;
        assert!(store.lca_candidates(&x, &y).unwrap().is_empty());
        assert_eq!(store.roots().len(), 2);
    }

    #[test]
    fn unknown_parent_leaves_store_unchanged() {
        let (mut store, [g, ..]) = diamond();
        let before: Vec<Commit> = store.all_commits().into_iter().cloned().collect();
        let missing = CommitId::from("c999999999999");

        let err = store.append(request("x", &[&g, &missing])).unwrap_err();
        assert!(matches!(err, LineageError::UnknownParent(ref p) if *p == missing));

        let after: Vec<Commit> = store.all_commits().into_iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(store.children_of(&g).len(), 2);
    }

    #[test]
    fn duplicate_parent_is_rejected() {
        let (mut store, [g, ..]) = diamond();
        assert!(matches!(
            store.append(request("x", &[&g, &g])),
            Err(LineageError::DuplicateParent(_))
        ));
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn append_only_keeps_prior_commits_identical() {
        let mut store = InMemoryLineageStore::new();
        let mut snapshots: Vec<Commit> = Vec::new();
        let mut parent: Option<CommitId> = None;
        for i in 0..5 {
            let name = format!("s{i}");
            let parents: Vec<&CommitId> = parent.iter().collect();
            let commit = store.append(request(&name, &parents)).unwrap();
            parent = Some(commit.id.clone());
            snapshots.push(commit);
            for earlier in &snapshots {
                assert_eq!(store.get(&earlier.id).unwrap(), earlier);
            }
        }
    }

    #[test]
    fn children_and_heads() {
        let (store, [g, a, b, m]) = diamond();
        assert_eq!(store.children_of(&g), BTreeSet::from([a.clone(), b.clone()]));
        assert_eq!(store.children_of(&a), BTreeSet::from([m.clone()]));
        assert!(store.children_of(&m).is_empty());
        assert!(store.children_of(&CommitId::from("unknown")).is_empty());
        let heads: Vec<&CommitId> = store.heads().iter().map(|c| &c.id).collect();
        assert_eq!(heads, vec![&m]);
    }

    #[test]
    fn all_commits_is_ordered() {
        let (store, ids) = diamond();
        let listed: Vec<CommitId> = store.all_commits().iter().map(|c| c.id.clone()).collect();
        assert_eq!(listed, ids.to_vec());
    }
}
