//! Change-log records.
//!
//! The log stores *inverted* deltas: a staged addition is recorded as a
//! `Deletion` entry and a staged removal as an `Insertion` entry. Applying an
//! entry's kind directly therefore moves state one step back in time, and
//! applying its inverse moves it forward again.

use crate::ids::{ChangesetId, GraphName, Timestamp};
use crate::triple::Triple;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation recorded by a change-log entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeltaKind {
    Insertion,
    Deletion,
}

impl DeltaKind {
    pub fn inverse(self) -> Self {
        match self {
            DeltaKind::Insertion => DeltaKind::Deletion,
            DeltaKind::Deletion => DeltaKind::Insertion,
        }
    }

    pub fn is_insertion(self) -> bool {
        self == DeltaKind::Insertion
    }
}

/// Which of the two logs an entry lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogKind {
    Active,
    Redo,
}

impl fmt::Display for LogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogKind::Active => f.write_str("active"),
            LogKind::Redo => f.write_str("redo"),
        }
    }
}

/// Append payload. The sequence number is assigned by the log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogAppend {
    pub changeset_id: ChangesetId,
    pub timestamp: Timestamp,
    pub graph: GraphName,
    pub kind: DeltaKind,
    pub triple: Triple,
    /// Whether the staged operation changed the live store. Replays skip
    /// entries whose operation was a no-op when it was committed.
    pub effective: bool,
}

/// Persisted change-log entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    /// Position in the log; unique and increasing in append order. An entry
    /// keeps its sequence number when it moves between active and redo logs.
    pub seq: u64,
    pub changeset_id: ChangesetId,
    pub timestamp: Timestamp,
    pub graph: GraphName,
    pub kind: DeltaKind,
    pub triple: Triple,
    pub effective: bool,
}

impl ChangeLogEntry {
    pub fn from_append(seq: u64, append: LogAppend) -> Self {
        Self {
            seq,
            changeset_id: append.changeset_id,
            timestamp: append.timestamp,
            graph: append.graph,
            kind: append.kind,
            triple: append.triple,
            effective: append.effective,
        }
    }

    /// Replay order: timestamp first, then log position.
    pub fn replay_key(&self) -> (Timestamp, u64) {
        (self.timestamp, self.seq)
    }
}

/// One committed changeset as seen by the version index.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionRecord {
    pub changeset_id: ChangesetId,
    pub graph: GraphName,
    pub timestamp: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverse_is_involutive() {
        for kind in [DeltaKind::Insertion, DeltaKind::Deletion] {
            assert_ne!(kind.inverse(), kind);
            assert_eq!(kind.inverse().inverse(), kind);
        }
    }

    #[test]
    fn replay_key_orders_by_time_then_seq() {
        let base = LogAppend {
            changeset_id: ChangesetId::generate(),
            timestamp: Timestamp::logical(2),
            graph: GraphName::from("g"),
            kind: DeltaKind::Deletion,
            triple: Triple::new("urn:s", "urn:p", "urn:o"),
            effective: true,
        };
        let late_seq_early_time = ChangeLogEntry::from_append(
            10,
            LogAppend {
                timestamp: Timestamp::logical(1),
                ..base.clone()
            },
        );
        let early_seq = ChangeLogEntry::from_append(3, base);
        assert!(late_seq_early_time.replay_key() < early_seq.replay_key());
    }
}
