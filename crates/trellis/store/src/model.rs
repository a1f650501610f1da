use serde::{Deserialize, Serialize};

/// Change-log entry in its persisted, storage-engine neutral shape.
///
/// Active and redo logs share this layout. Identifiers and the triple are
/// kept in encoded form so that every adapter decodes through
/// [`crate::codec`] and fails the same way on corrupt data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRow {
    pub seq: i64,
    pub changeset_id: String,
    pub timestamp: i64,
    pub graph: String,
    pub is_insertion: bool,
    pub effective: bool,
    /// JSON encoded `[subject, predicate, object]`.
    pub triple: String,
}
