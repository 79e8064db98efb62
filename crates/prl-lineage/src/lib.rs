//! Append-only lineage store for the Persistent Reasoning Lineage (PRL).
//!
//! Commits are immutable records linked to their parents; together they form
//! a DAG rooted at one or more genesis commits. Parents must exist before a
//! child can be appended, so the graph is acyclic by construction.
//!
//! Two [`LineageStore`] implementations are provided:
//!
//! - [`InMemoryLineageStore`] — a process-local store for tests and analysis
//! - [`FileLineageStore`] — an append-only log file with CRC-framed records
//!
//! Both assume a single serialized writer, expressed by `append(&mut self)`.

pub mod clock;
pub mod commit;
pub mod error;
pub mod file;
pub mod index;
pub mod memory;
pub mod store;

pub use clock::IdMode;
pub use commit::{Commit, CommitId, CommitRequest, Operation, Subject};
pub use error::{LineageError, LineageResult};
pub use file::{FileLineageStore, FileStoreConfig, SyncMode};
pub use memory::InMemoryLineageStore;
pub use store::LineageStore;
