//! Commit pipeline.
//!
//! A commit runs as a sequence of stages under the writer lock:
//! apply staged mutations, append inverted entries to the active log,
//! run precommit hooks, clear the redo log, then run postcommit hooks.
//! Any failure before the commit point is compensated: effective store
//! mutations are reverted newest-first and the changeset's log entries
//! are discarded.

use crate::changeset::{ChangesetParts, ChangesetRecord, CommitReceipt};
use crate::error::{HookFailure, TrellisError, TrellisResult};
use crate::hooks::HookContext;
use crate::replay;
use crate::{Changeset, Dataset};
use tracing::{debug, error, info, warn};
use trellis_store::StorageError;
use trellis_types::{ChangesetId, DeltaKind, LogAppend, LogKind, Timestamp, Triple};

/// Store mutations applied so far, plus the failure that stopped them.
struct ApplyFailure {
    applied: Vec<LogAppend>,
    source: StorageError,
}

impl Dataset {
    /// Commit a staged changeset.
    ///
    /// Removals are applied before additions, so a triple staged both ways
    /// ends up present. Every staged operation is logged, including no-ops.
    ///
    /// On `HookFailedPostCommit` the changeset is committed and stays
    /// committed.
    pub async fn commit(&self, changeset: Changeset) -> TrellisResult<CommitReceipt> {
        let _writer = self.writer.lock().await;

        let parts = changeset.into_parts();
        let id = parts.id;
        let timestamp = parts.timestamp.unwrap_or_else(Timestamp::now);
        debug!(
            changeset = %id,
            graph = %parts.graph,
            %timestamp,
            additions = parts.additions.len(),
            removals = parts.removals.len(),
            "committing changeset"
        );

        let appends = match self.apply_staged(&parts, timestamp).await {
            Ok(appends) => appends,
            Err(failure) => {
                self.revert_pending(id, &failure.applied).await?;
                return Err(aborted(id, failure.source));
            }
        };

        let entries = match self.log.append(&appends).await {
            Ok(entries) => entries,
            Err(source) => {
                self.revert_pending(id, &appends).await?;
                return Err(aborted(id, source));
            }
        };

        let ChangesetParts {
            graph,
            additions,
            removals,
            namespaces,
            ..
        } = parts;
        let record = ChangesetRecord {
            id,
            graph,
            timestamp,
            additions,
            removals,
            entries,
        };
        let ctx = HookContext::new(self.store.as_ref(), &record);

        for (name, hook) in self.precommit.iter() {
            if let Err(err) = hook.call(&ctx).await {
                let reason = format!("{err:#}");
                warn!(hook = name, changeset = %id, error = %reason, "precommit hook failed; rolling back");
                self.rollback(&record).await?;
                return Err(TrellisError::HookAborted {
                    hook: name.to_string(),
                    changeset: id,
                    reason,
                });
            }
        }

        if self.config.clear_redo_on_commit && !record.entries.is_empty() {
            match self.log.clear(LogKind::Redo).await {
                Ok(0) => {}
                Ok(cleared) => debug!(cleared, "redo log cleared"),
                Err(source) => {
                    self.rollback(&record).await?;
                    return Err(aborted(id, source));
                }
            }
        }

        // Committed from here on.
        self.record_namespaces(namespaces);
        let receipt = CommitReceipt {
            version: record.version(),
            entries: record.entries.len(),
            changed: record.changed(),
        };
        info!(
            changeset = %id,
            graph = %record.graph,
            timestamp = %record.timestamp,
            entries = receipt.entries,
            changed = receipt.changed,
            "changeset committed"
        );

        let mut failures = Vec::new();
        for (name, hook) in self.postcommit.iter() {
            if let Err(err) = hook.call(&ctx).await {
                let reason = format!("{err:#}");
                warn!(hook = name, changeset = %id, error = %reason, "postcommit hook failed");
                failures.push(HookFailure {
                    hook: name.to_string(),
                    reason,
                });
            }
        }
        if !failures.is_empty() {
            return Err(TrellisError::HookFailedPostCommit {
                changeset: id,
                failures,
            });
        }

        Ok(receipt)
    }

    async fn apply_staged(
        &self,
        parts: &ChangesetParts,
        timestamp: Timestamp,
    ) -> Result<Vec<LogAppend>, ApplyFailure> {
        let mut appends = Vec::with_capacity(parts.removals.len() + parts.additions.len());
        let entry = |kind: DeltaKind, triple: &Triple, effective: bool| LogAppend {
            changeset_id: parts.id,
            timestamp,
            graph: parts.graph.clone(),
            kind,
            triple: triple.clone(),
            effective,
        };

        for triple in &parts.removals {
            match self.store.remove(&parts.graph, triple).await {
                Ok(effective) => appends.push(entry(DeltaKind::Insertion, triple, effective)),
                Err(source) => {
                    return Err(ApplyFailure {
                        applied: appends,
                        source,
                    })
                }
            }
        }

        for chunk in parts.additions.chunks(self.config.addition_batch_size) {
            let flags = match self.store.insert_batch(&parts.graph, chunk).await {
                Ok(flags) => flags,
                Err(source) => {
                    return Err(ApplyFailure {
                        applied: appends,
                        source,
                    })
                }
            };
            if flags.len() != chunk.len() {
                // Unknown which triples of this chunk landed; only earlier
                // chunks are reverted.
                return Err(ApplyFailure {
                    applied: appends,
                    source: StorageError::InvariantViolation(format!(
                        "batch insert returned {} flags for {} triples",
                        flags.len(),
                        chunk.len()
                    )),
                });
            }
            appends.extend(
                chunk
                    .iter()
                    .zip(flags)
                    .map(|(t, effective)| entry(DeltaKind::Deletion, t, effective)),
            );
        }

        Ok(appends)
    }

    /// Revert store mutations of a changeset that has no log entries.
    async fn revert_pending(&self, id: ChangesetId, applied: &[LogAppend]) -> TrellisResult<()> {
        let steps = replay::backward_pending(applied);
        if let Err(source) = replay::run(self.store.as_ref(), &steps).await {
            return Err(rollback_failed(id, source));
        }
        debug!(changeset = %id, reverted = steps.len(), "store mutations reverted");
        Ok(())
    }

    /// Undo a changeset whose entries are already in the active log.
    async fn rollback(&self, record: &ChangesetRecord) -> TrellisResult<()> {
        let steps = replay::backward(&record.entries);
        if let Err(source) = replay::run(self.store.as_ref(), &steps).await {
            return Err(rollback_failed(record.id, source));
        }
        match self.log.discard_changeset(LogKind::Active, &record.id).await {
            Ok(discarded) => {
                debug!(changeset = %record.id, discarded, "changeset rolled back");
                Ok(())
            }
            Err(source) => Err(rollback_failed(record.id, source)),
        }
    }

    fn record_namespaces(&self, bindings: Vec<(String, String)>) {
        if bindings.is_empty() {
            return;
        }
        match self.namespaces.write() {
            Ok(mut map) => {
                for (prefix, iri) in bindings {
                    map.bind(prefix, iri);
                }
            }
            Err(_) => warn!("namespace lock poisoned; bindings not recorded"),
        }
    }
}

fn aborted(changeset: ChangesetId, source: StorageError) -> TrellisError {
    TrellisError::TransactionAborted {
        changeset,
        reason: source.to_string(),
    }
}

pub(crate) fn rollback_failed(changeset: ChangesetId, source: StorageError) -> TrellisError {
    error!(changeset = %changeset, error = %source, "rollback failed; store may be inconsistent");
    TrellisError::RollbackFailed {
        changeset,
        reason: source.to_string(),
    }
}
