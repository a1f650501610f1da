use std::fmt;
use thiserror::Error;
use trellis_store::StorageError;
use trellis_types::{ChangesetId, LogKind};

pub type TrellisResult<T> = Result<T, TrellisError>;

/// One postcommit hook that reported an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookFailure {
    pub hook: String,
    pub reason: String,
}

impl fmt::Display for HookFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.hook, self.reason)
    }
}

/// Errors from dataset operations.
#[derive(Debug, Error)]
pub enum TrellisError {
    /// Undo (active log) or redo (redo log) found no changeset to move.
    #[error("nothing to {action}: {0} log is empty", action = empty_log_action(.0))]
    EmptyLog(LogKind),

    /// A precommit hook failed; the changeset was rolled back.
    #[error("precommit hook `{hook}` aborted changeset {changeset}: {reason}")]
    HookAborted {
        hook: String,
        changeset: ChangesetId,
        reason: String,
    },

    /// Postcommit hooks failed. The changeset is committed and stays applied.
    #[error(
        "changeset {changeset} committed but {} postcommit hook(s) failed: {}",
        .failures.len(),
        join_failures(.failures)
    )]
    HookFailedPostCommit {
        changeset: ChangesetId,
        failures: Vec<HookFailure>,
    },

    #[error("malformed log entry #{seq}: {reason}")]
    MalformedLogEntry { seq: u64, reason: String },

    /// A storage failure inside a commit, undo or redo; the operation was
    /// rolled back.
    #[error("changeset {changeset} aborted: {reason}")]
    TransactionAborted {
        changeset: ChangesetId,
        reason: String,
    },

    /// Undo or redo found the live graph out of line with the log; nothing
    /// was changed.
    #[error("changeset {changeset} cannot be replayed: {reason}")]
    HistoryDiverged {
        changeset: ChangesetId,
        reason: String,
    },

    /// Compensation after a failed commit, undo or redo did not complete.
    #[error("rollback of changeset {changeset} failed: {reason}")]
    RollbackFailed {
        changeset: ChangesetId,
        reason: String,
    },

    /// The staging closure of a scoped changeset returned an error.
    #[error("staging of changeset {changeset} failed: {reason}")]
    Staging {
        changeset: ChangesetId,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Storage(StorageError),
}

impl TrellisError {
    pub fn is_empty_log(&self) -> bool {
        matches!(self, TrellisError::EmptyLog(_))
    }
}

impl From<StorageError> for TrellisError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::MalformedEntry { seq, reason } => {
                TrellisError::MalformedLogEntry { seq, reason }
            }
            other => TrellisError::Storage(other),
        }
    }
}

fn empty_log_action(log: &LogKind) -> &'static str {
    match log {
        LogKind::Active => "undo",
        LogKind::Redo => "redo",
    }
}

fn join_failures(failures: &[HookFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
