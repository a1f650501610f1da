use thiserror::Error;
use trellis_types::{ChangesetId, LogKind};

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors from graph stores and change logs.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A move found no entries of the changeset in the source log.
    #[error("changeset {changeset} not found in {log} log")]
    ChangesetNotFound {
        changeset: ChangesetId,
        log: LogKind,
    },

    /// A row collided with an existing log sequence number.
    #[error("log sequence conflict: {0}")]
    SequenceConflict(String),

    #[error("log invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("triple encoding failed: {0}")]
    Encoding(String),

    /// A persisted log row could not be decoded.
    #[error("malformed log entry #{seq}: {reason}")]
    MalformedEntry { seq: u64, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}
