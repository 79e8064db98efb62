//! Commit id allocation and the per-store monotonic clock.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::commit::CommitId;

/// How a store allocates commit ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Time-ordered UUID v7 in simple hex form.
    #[default]
    Uuid,
    /// `c000000000001`, `c000000000002`, ... in append order. Reproducible
    /// across runs, intended for fixtures and demos.
    Sequential,
}

impl IdMode {
    /// Allocate the id for the `seq`-th commit of a store (1-based).
    pub fn allocate(&self, seq: usize) -> CommitId {
        match self {
            Self::Uuid => CommitId::new(uuid::Uuid::now_v7().simple().to_string()),
            Self::Sequential => CommitId::new(format!("c{seq:012}")),
        }
    }
}

impl std::str::FromStr for IdMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uuid" => Ok(Self::Uuid),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!("unknown id mode: {other} (expected uuid or sequential)")),
        }
    }
}

/// Wall-clock milliseconds since the UNIX epoch.
pub fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Next commit timestamp: the wall clock, bumped past `last` when the clock
/// has not moved or went backwards.
pub fn next_timestamp(last: Option<u64>) -> u64 {
    let now = wall_clock_ms();
    match last {
        Some(last) if now <= last => last + 1,
        _ => now,
    }
}
