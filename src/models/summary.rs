//! Indexing job state, counters and progress snapshots.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Lifecycle of an indexing job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    /// Whether the job has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Cancelled | JobState::Failed
        )
    }
}

/// Final counters of a finished indexing run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSummary {
    /// Messages examined, including skipped ones
    pub scanned: u64,

    /// New records written
    pub saved: u64,

    /// Records already present (updated in place)
    pub duplicate: u64,

    /// Per-item failures that were counted and skipped
    pub errors: u64,

    /// Messages without indexable media
    pub non_media: u64,

    /// Wall-clock duration of the run
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

/// Point-in-time view of a running (or finished) job.
///
/// Emitted to the progress sink every few hundred items and returned by
/// `JobHandle::status`; not part of the run's return contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub state: JobState,
    pub scanned: u64,
    pub saved: u64,
    pub duplicate: u64,
    pub errors: u64,
    pub non_media: u64,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}
