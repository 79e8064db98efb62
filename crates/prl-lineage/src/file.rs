//! Append-only log file backing a lineage store.
//!
//! On-disk format, one frame per commit:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized Commit)]
//! ```
//!
//! A commit carries its parent ids, so one frame holds the commit and all of
//! its edges. On open the file is replayed front to back. A damaged frame is a
//! torn write only if nothing after it is a complete, CRC-valid frame; then it
//! alone is dropped and the file truncated to the last good frame. Damage
//! anywhere else, including a zero or oversized length, is corruption.

use std::collections::BTreeSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::IdMode;
use crate::commit::{Commit, CommitId, CommitRequest};
use crate::error::{LineageError, LineageResult};
use crate::index::LineageIndex;
use crate::store::LineageStore;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Upper bound on a single frame's payload. Appends above it are refused.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every append.
    #[default]
    EveryWrite,
    /// Flush to the OS and rely on its page cache.
    OsDefault,
}

/// Configuration for a [`FileLineageStore`].
#[derive(Clone, Debug, Default)]
pub struct FileStoreConfig {
    /// How new commit ids are allocated.
    pub id_mode: IdMode,
    /// Durability of each append.
    pub sync_mode: SyncMode,
}

/// File-backed [`LineageStore`].
///
/// The whole lineage is also held in memory; the file is only read on open.
pub struct FileLineageStore {
    path: PathBuf,
    file: File,
    /// Length of the valid prefix of the file.
    offset: u64,
    index: LineageIndex,
    config: FileStoreConfig,
    /// Set when a failed append could not be truncated away.
    failed: bool,
}

impl FileLineageStore {
    /// Open (or create) a lineage log and replay it.
    pub fn open(path: &Path, config: FileStoreConfig) -> LineageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let mut index = LineageIndex::new(config.id_mode);
        let valid = replay(&bytes, &mut index)?;
        if valid < bytes.len() as u64 {
            warn!(
                path = %path.display(),
                valid,
                file_len = bytes.len(),
                "dropping torn tail of lineage log"
            );
            file.set_len(valid)?;
        }

        info!(path = %path.display(), commits = index.len(), "opened lineage log");
        Ok(Self {
            path: path.to_path_buf(),
            file,
            offset: valid,
            index,
            config,
            failed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn id_mode(&self) -> IdMode {
        self.config.id_mode
    }

    fn write_frame(&mut self, payload: &[u8]) -> std::io::Result<()> {
        let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
        frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
        frame.extend_from_slice(payload);

        self.file.write_all(&frame)?;
        self.file.flush()?;
        if self.config.sync_mode == SyncMode::EveryWrite {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

impl LineageStore for FileLineageStore {
    fn append(&mut self, request: CommitRequest) -> LineageResult<Commit> {
        if self.failed {
            return Err(LineageError::Unwritable(format!(
                "{} has a partial frame past offset {}; reopen to recover",
                self.path.display(),
                self.offset
            )));
        }
        let commit = self.index.prepare(request)?;
        let payload =
            bincode::serialize(&commit).map_err(|e| LineageError::Serialization(e.to_string()))?;
        if payload.len() > MAX_FRAME_LEN {
            return Err(LineageError::Serialization(format!(
                "commit encodes to {} bytes, over the {MAX_FRAME_LEN} byte frame limit",
                payload.len()
            )));
        }

        if let Err(e) = self.write_frame(&payload) {
            if let Err(undo) = self.file.set_len(self.offset) {
                warn!(offset = self.offset, error = %undo, "failed to roll back partial frame");
                self.failed = true;
            }
            return Err(e.into());
        }

        let entry_offset = self.offset;
        self.offset += (HEADER_SIZE + payload.len()) as u64;
        self.index.insert(commit.clone())?;
        debug!(offset = entry_offset, len = payload.len(), "lineage log append");
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

/// Replay frames into `index`. Returns the length of the valid prefix.
fn replay(bytes: &[u8], index: &mut LineageIndex) -> LineageResult<u64> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < HEADER_SIZE {
            warn!(offset, "truncated frame header; stopping recovery");
            break;
        }
        let (length, expected_crc) = header(rest);
        if length == 0 || length > MAX_FRAME_LEN {
            return Err(corrupt(offset, format!("implausible frame length {length}")));
        }
        let end = HEADER_SIZE + length;
        if end > rest.len() {
            if valid_frame_follows(&rest[HEADER_SIZE..]) {
                return Err(corrupt(
                    offset,
                    format!("frame length {length} overruns a later valid frame"),
                ));
            }
            warn!(offset, length, "incomplete frame; stopping recovery");
            break;
        }

        let payload = &rest[HEADER_SIZE..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc != expected_crc {
            if end == rest.len() && !valid_frame_follows(&rest[HEADER_SIZE..]) {
                warn!(offset, "CRC mismatch on final frame; treating as torn write");
                break;
            }
            return Err(corrupt(
                offset,
                format!("CRC mismatch (expected {expected_crc:#010x}, got {actual_crc:#010x})"),
            ));
        }

        let commit: Commit =
            bincode::deserialize(payload).map_err(|e| corrupt(offset, e.to_string()))?;
        index
            .insert(commit)
            .map_err(|e| corrupt(offset, e.to_string()))?;
        offset += end;
    }
    debug!(recovered = index.len(), "lineage log replay complete");
    Ok(offset as u64)
}

fn header(bytes: &[u8]) -> (usize, u32) {
    let length = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let crc = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    (length, crc)
}

/// Whether a complete, CRC-valid commit frame starts anywhere in `bytes`.
///
/// A torn write only ever damages the last frame, so finding one means the
/// damage is not a torn tail.
fn valid_frame_follows(bytes: &[u8]) -> bool {
    (0..bytes.len().saturating_sub(HEADER_SIZE)).any(|start| {
        let rest = &bytes[start..];
        let (length, crc) = header(rest);
        if length == 0 || length > MAX_FRAME_LEN || HEADER_SIZE + length > rest.len() {
            return false;
        }
        let payload = &rest[HEADER_SIZE..HEADER_SIZE + length];
        crc32fast::hash(payload) == crc && bincode::deserialize::<Commit>(payload).is_ok()
    })
}

fn corrupt(offset: usize, reason: String) -> LineageError {
    LineageError::Corrupt {
        offset: offset as u64,
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::{Operation, Subject};
    use prl_canon::Value;
    use std::io::{Seek, SeekFrom};

    fn config() -> FileStoreConfig {
        FileStoreConfig {
            id_mode: IdMode::Sequential,
            sync_mode: SyncMode::OsDefault,
        }
    }

    fn request(subject: &str, parents: &[CommitId]) -> CommitRequest {
        CommitRequest::new(
            Operation::Add,
            Subject::global(subject, "motif", "test"),
            Value::map([
                ("statement", Value::from(subject)),
                ("weight", Value::Float(0.5)),
                ("tags", Value::set(["x", "y"])),
            ]),
        )
        .with_parents(parents.iter().cloned())
        .with_note(format!("add {subject}"))
    }

    fn patch(path: &Path, at: u64, bytes: &[u8]) {
        let mut file = OpenOptions::new().write(true).open(path).unwrap();
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(bytes).unwrap();
        file.sync_all().unwrap();
    }

    fn flip(path: &Path, at: u64) {
        let mut file = OpenOptions::new().read(true).write(true).open(path).unwrap();
        let mut buf = [0u8; 1];
        file.seek(SeekFrom::Start(at)).unwrap();
        file.read_exact(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        file.seek(SeekFrom::Start(at)).unwrap();
        file.write_all(&buf).unwrap();
        file.sync_all().unwrap();
    }

    /// Seeds a log and returns the start offset of each frame plus the file length.
    fn seeded_log(path: &Path) -> (Vec<u64>, u64) {
        let mut store = FileLineageStore::open(path, config()).unwrap();
        let mut starts = Vec::new();
        let g = store.append(request("g", &[])).unwrap().id;
        for subject in ["a", "b", "c"] {
            starts.push(store.offset);
            store.append(request(subject, &[g.clone()])).unwrap();
        }
        starts.insert(0, 0);
        (starts, store.offset)
    }

    fn seed(store: &mut FileLineageStore) -> Vec<CommitId> {
        let g = store.append(request("g", &[])).unwrap().id;
        let a = store.append(request("a", &[g.clone()])).unwrap().id;
        let b = store.append(request("b", &[g.clone()])).unwrap().id;
        let m = store.append(request("m", &[a.clone(), b.clone()])).unwrap().id;
        vec![g, a, b, m]
    }

    #[test]
    fn append_and_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");

        let mut store = FileLineageStore::open(&path, config()).unwrap();
        let ids = seed(&mut store);
        let before: Vec<Commit> = store.all_commits().into_iter().cloned().collect();
        drop(store);

        let reopened = FileLineageStore::open(&path, config()).unwrap();
        let after: Vec<Commit> = reopened.all_commits().into_iter().cloned().collect();
        assert_eq!(before, after);
        assert_eq!(
            reopened.ancestors_of(&ids[3]).unwrap(),
            BTreeSet::from([ids[0].clone(), ids[1].clone(), ids[2].clone()])
        );
    }

    #[test]
    fn sequential_ids_continue_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let mut store = FileLineageStore::open(&path, config()).unwrap();
        let ids = seed(&mut store);
        drop(store);

        let mut store = FileLineageStore::open(&path, config()).unwrap();
        let next = store.append(request("n", &[ids[3].clone()])).unwrap();
        assert_eq!(next.id.as_str(), "c000000000005");
        let last_ts = ids
            .iter()
            .map(|id| store.get(id).unwrap().timestamp_ms)
            .max()
            .unwrap();
        assert!(next.timestamp_ms > last_ts);
    }

    #[test]
    fn open_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLineageStore::open(&dir.path().join("nested/empty.log"), config()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn torn_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let mut store = FileLineageStore::open(&path, config()).unwrap();
        seed(&mut store);
        let good_len = store.offset;
        drop(store);

        // Simulate a crash halfway through writing a fifth frame.
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&200u32.to_le_bytes()).unwrap();
            file.write_all(&0u32.to_le_bytes()).unwrap();
            file.write_all(&[0xAB; 17]).unwrap();
        }

        let mut store = FileLineageStore::open(&path, config()).unwrap();
        assert_eq!(store.len(), 4);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len);

        // The log stays appendable after recovery.
        store.append(request("after", &[])).unwrap();
        drop(store);
        assert_eq!(FileLineageStore::open(&path, config()).unwrap().len(), 5);
    }

    #[test]
    fn corrupt_middle_frame_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let mut store = FileLineageStore::open(&path, config()).unwrap();
        seed(&mut store);
        drop(store);

        flip(&path, HEADER_SIZE as u64);

        assert!(matches!(
            FileLineageStore::open(&path, config()),
            Err(LineageError::Corrupt { offset: 0, .. })
        ));
    }

    #[test]
    fn rejected_append_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let mut store = FileLineageStore::open(&path, config()).unwrap();
        seed(&mut store);
        let len = fs::metadata(&path).unwrap().len();

        let err = store
            .append(request("x", &[CommitId::from("missing")]))
            .unwrap_err();
        assert!(matches!(err, LineageError::UnknownParent(_)));
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn oversized_length_in_first_frame_is_corrupt_not_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let (_, file_len) = seeded_log(&path);

        patch(&path, 0, &u32::MAX.to_le_bytes());

        assert!(matches!(
            FileLineageStore::open(&path, config()),
            Err(LineageError::Corrupt { offset: 0, .. })
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), file_len);
    }

    #[test]
    fn overrunning_length_in_middle_frame_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let (starts, file_len) = seeded_log(&path);

        // Plausible length, but it runs past the end of the file.
        patch(&path, starts[1], &(file_len as u32).to_le_bytes());

        match FileLineageStore::open(&path, config()) {
            Err(LineageError::Corrupt { offset, .. }) => assert_eq!(offset, starts[1]),
            other => panic!("expected corruption, got {:?}", other.map(|s| s.len())),
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), file_len);
    }

    #[test]
    fn zero_length_frame_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let (starts, file_len) = seeded_log(&path);

        patch(&path, starts[2], &0u32.to_le_bytes());

        match FileLineageStore::open(&path, config()) {
            Err(LineageError::Corrupt { offset, .. }) => assert_eq!(offset, starts[2]),
            other => panic!("expected corruption, got {:?}", other.map(|s| s.len())),
        }
        assert_eq!(fs::metadata(&path).unwrap().len(), file_len);
    }

    #[test]
    fn crc_mismatch_on_final_frame_drops_only_that_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let (starts, file_len) = seeded_log(&path);

        flip(&path, file_len - 1);

        let store = FileLineageStore::open(&path, config()).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(fs::metadata(&path).unwrap().len(), starts[3]);
    }

    #[test]
    fn unrecovered_rollback_refuses_further_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lineage.log");
        let mut store = FileLineageStore::open(&path, config()).unwrap();
        seed(&mut store);
        let len = fs::metadata(&path).unwrap().len();

        store.failed = true;

        assert!(matches!(
            store.append(request("x", &[])),
            Err(LineageError::Unwritable(_))
        ));
        assert_eq!(store.len(), 4);
        assert_eq!(fs::metadata(&path).unwrap().len(), len);
    }
}
