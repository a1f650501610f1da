//! Undo and redo.
//!
//! Both operate on whole changesets across the dataset. Undo replays the
//! newest active changeset's entries as stored, then moves them to the redo
//! log. Redo replays an undone changeset's entries inverted, then moves them
//! back to the active log. Either way the store is changed before the move,
//! and a failed move is compensated.
//!
//! Every replayed entry must change the live graph. If one does not, the
//! graph has diverged from the log and the operation is reverted, leaving
//! the changeset where it was.

use crate::config::RedoOrder;
use crate::error::{TrellisError, TrellisResult};
use crate::replay::{self, StepCause, StepFailure};
use crate::transaction::rollback_failed;
use crate::Dataset;
use tracing::info;
use trellis_store::StorageError;
use trellis_types::{ChangesetId, LogKind, VersionRecord};

impl Dataset {
    /// Revert the most recently committed changeset.
    ///
    /// Returns the version that was undone, or `EmptyLog(Active)` if there
    /// is nothing to undo.
    pub async fn undo(&self) -> TrellisResult<VersionRecord> {
        let _writer = self.writer.lock().await;

        let version = self
            .log
            .versions(LogKind::Active, None)
            .await?
            .into_iter()
            .next()
            .ok_or(TrellisError::EmptyLog(LogKind::Active))?;
        let id = version.changeset_id;
        let entries = self.log.changeset_entries(LogKind::Active, &id).await?;

        let steps = replay::backward(&entries);
        replay::apply_steps(self.store.as_ref(), &steps)
            .await
            .map_err(|failure| step_failed(id, failure))?;

        if let Err(source) = self.log.move_changeset(&id, LogKind::Active, LogKind::Redo).await {
            // Put the store back in line with the log, which still holds
            // the changeset as active.
            replay::run(self.store.as_ref(), &replay::forward(&entries))
                .await
                .map_err(|e| rollback_failed(id, e))?;
            return Err(source.into());
        }

        info!(
            changeset = %id,
            graph = %version.graph,
            timestamp = %version.timestamp,
            replayed = steps.len(),
            "changeset undone"
        );
        Ok(version)
    }

    /// Re-apply an undone changeset, chosen by the configured `RedoOrder`.
    ///
    /// Returns the version that was redone, or `EmptyLog(Redo)` if there is
    /// nothing to redo.
    pub async fn redo(&self) -> TrellisResult<VersionRecord> {
        let _writer = self.writer.lock().await;

        let stack = self.log.redo_stack().await?;
        let id = match self.config.redo_order {
            RedoOrder::Lifo => stack.last(),
            RedoOrder::Fifo => stack.first(),
        }
        .copied()
        .ok_or(TrellisError::EmptyLog(LogKind::Redo))?;
        let version = self
            .log
            .versions(LogKind::Redo, None)
            .await?
            .into_iter()
            .find(|v| v.changeset_id == id)
            .ok_or_else(|| {
                StorageError::InvariantViolation(format!(
                    "changeset {id} is on the redo stack but has no entries"
                ))
            })?;

        let entries = self.log.changeset_entries(LogKind::Redo, &id).await?;
        let steps = replay::forward(&entries);
        replay::apply_steps(self.store.as_ref(), &steps)
            .await
            .map_err(|failure| step_failed(id, failure))?;

        if let Err(source) = self.log.move_changeset(&id, LogKind::Redo, LogKind::Active).await {
            // The changeset stays in the redo log; take its effect back out.
            replay::run(self.store.as_ref(), &replay::backward(&entries))
                .await
                .map_err(|e| rollback_failed(id, e))?;
            return Err(source.into());
        }

        info!(
            changeset = %id,
            graph = %version.graph,
            timestamp = %version.timestamp,
            replayed = steps.len(),
            "changeset redone"
        );
        Ok(version)
    }
}

fn step_failed(changeset: ChangesetId, failure: StepFailure) -> TrellisError {
    match (failure.cause, failure.reverted) {
        (StepCause::Storage(source), true) => TrellisError::TransactionAborted {
            changeset,
            reason: source.to_string(),
        },
        (StepCause::Drift(reason), true) => TrellisError::HistoryDiverged { changeset, reason },
        (StepCause::Storage(source), false) => rollback_failed(changeset, source),
        (StepCause::Drift(reason), false) => {
            rollback_failed(changeset, StorageError::InvariantViolation(reason))
        }
    }
}
