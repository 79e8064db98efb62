//! Per-head subject views.
//!
//! A view is what a head "sees": the latest commit per subject along the
//! linear chain ending at the head. The chain is the head itself plus every
//! ancestor reachable through single-parent links; a parent that is a genesis
//! or a merge commit is a boundary and is not part of the chain. History
//! behind a merge is not flattened.

use std::collections::BTreeMap;

use prl_canon::{canonicalize, Value};
use prl_lineage::{Commit, CommitId, LineageStore};
use tracing::debug;

use crate::error::MergeResult;

/// Signature reported for payloads that cannot be canonicalized.
pub const OPAQUE_PAYLOAD: &str = "<opaque-payload>";

/// Subject id -> most recent commit on a chain.
#[derive(Clone, Debug, Default)]
pub struct SubjectView<'a> {
    latest: BTreeMap<&'a str, &'a Commit>,
    chain_len: usize,
}

impl<'a> SubjectView<'a> {
    /// Walk back from `head` and index the chain it terminates.
    pub fn build<S: LineageStore + ?Sized>(store: &'a S, head: &CommitId) -> MergeResult<Self> {
        let mut view = Self::default();
        let mut current = store.get(head)?;
        loop {
            view.observe(current);
            let [parent] = current.parents.as_slice() else {
                break;
            };
            let parent = store.get(parent)?;
            if parent.parents.len() != 1 {
                break;
            }
            current = parent;
        }
        debug!(head = %head, chain = view.chain_len, subjects = view.latest.len(), "built subject view");
        Ok(view)
    }

    /// Walking newest to oldest, the first commit seen per subject wins.
    fn observe(&mut self, commit: &'a Commit) {
        self.chain_len += 1;
        self.latest.entry(commit.subject.id.as_str()).or_insert(commit);
    }

    pub fn get(&self, subject_id: &str) -> Option<&'a Commit> {
        self.latest.get(subject_id).copied()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.latest.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }

    /// Number of commits on the chain.
    pub fn chain_len(&self) -> usize {
        self.chain_len
    }
}

/// Canonical form of a payload, or `None` if it has none.
pub(crate) fn canonical_signature(payload: &Value) -> Option<String> {
    canonicalize(payload).ok()
}

/// Structural signature of a payload, used in conflict reports.
pub fn payload_signature(payload: &Value) -> String {
    canonical_signature(payload).unwrap_or_else(|| OPAQUE_PAYLOAD.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prl_lineage::{CommitRequest, InMemoryLineageStore, Operation, Subject};

    fn append(
        store: &mut InMemoryLineageStore,
        subject: &str,
        payload: Value,
        parents: &[&CommitId],
    ) -> CommitId {
        store
            .append(
                CommitRequest::new(Operation::Add, Subject::global(subject, "motif", "t"), payload)
                    .with_parents(parents.iter().map(|p| (*p).clone())),
            )
            .unwrap()
            .id
    }

    #[test]
    fn genesis_head_sees_itself() {
        let mut store = InMemoryLineageStore::sequential();
        let g = append(&mut store, "g", Value::empty_map(), &[]);
        let view = SubjectView::build(&store, &g).unwrap();
        assert_eq!(view.chain_len(), 1);
        assert_eq!(view.get("g").unwrap().id, g);
    }

    #[test]
    fn genesis_parent_is_a_boundary() {
        let mut store = InMemoryLineageStore::sequential();
        let g = append(&mut store, "g", Value::empty_map(), &[]);
        let a1 = append(&mut store, "a", Value::from(1i64), &[&g]);
        let a2 = append(&mut store, "a", Value::from(2i64), &[&a1]);
        let b = append(&mut store, "b", Value::from(3i64), &[&a2]);

        let view = SubjectView::build(&store, &b).unwrap();
        assert_eq!(view.chain_len(), 3);
        assert_eq!(view.subjects().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(view.get("a").unwrap().id, a2, "latest occurrence wins");
        assert!(view.get("g").is_none());
    }

    #[test]
    fn merge_parent_stops_the_walk() {
        let mut store = InMemoryLineageStore::sequential();
        let g = append(&mut store, "g", Value::empty_map(), &[]);
        let l = append(&mut store, "l", Value::Null, &[&g]);
        let r = append(&mut store, "r", Value::Null, &[&g]);
        let m = append(&mut store, "m", Value::Null, &[&l, &r]);
        let after = append(&mut store, "x", Value::Null, &[&m]);

        let view = SubjectView::build(&store, &after).unwrap();
        assert_eq!(view.subjects().collect::<Vec<_>>(), vec!["x"]);

        let at_merge = SubjectView::build(&store, &m).unwrap();
        assert_eq!(at_merge.subjects().collect::<Vec<_>>(), vec!["m"]);
    }

    #[test]
    fn opaque_payload_signature() {
        assert_eq!(payload_signature(&Value::Float(f64::NAN)), OPAQUE_PAYLOAD);
        assert_eq!(payload_signature(&Value::map([("a", 1i64)])), r#"{"a":1}"#);
    }
}
