//! Applying logged entries to the live graph store.
//!
//! Entries hold inverted deltas. Walking a changeset's effective entries
//! newest-first and applying each kind as-is reverts the changeset; walking
//! them oldest-first and applying the inverse kind re-applies it.

use tracing::warn;
use trellis_store::{GraphStore, StorageError};
use trellis_types::{ChangeLogEntry, DeltaKind, GraphName, LogAppend, Triple};

/// One store mutation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Step<'a> {
    pub graph: &'a GraphName,
    pub kind: DeltaKind,
    pub triple: &'a Triple,
}

impl Step<'_> {
    fn inverse(self) -> Self {
        Self {
            kind: self.kind.inverse(),
            ..self
        }
    }
}

/// Steps that revert committed entries.
pub(crate) fn backward(entries: &[ChangeLogEntry]) -> Vec<Step<'_>> {
    entries
        .iter()
        .rev()
        .filter(|e| e.effective)
        .map(|e| Step {
            graph: &e.graph,
            kind: e.kind,
            triple: &e.triple,
        })
        .collect()
}

/// Steps that re-apply committed entries.
pub(crate) fn forward(entries: &[ChangeLogEntry]) -> Vec<Step<'_>> {
    entries
        .iter()
        .filter(|e| e.effective)
        .map(|e| Step {
            graph: &e.graph,
            kind: e.kind.inverse(),
            triple: &e.triple,
        })
        .collect()
}

/// Steps that revert store mutations of a commit that never reached the log.
pub(crate) fn backward_pending(appends: &[LogAppend]) -> Vec<Step<'_>> {
    appends
        .iter()
        .rev()
        .filter(|a| a.effective)
        .map(|a| Step {
            graph: &a.graph,
            kind: a.kind,
            triple: &a.triple,
        })
        .collect()
}

/// Why a step sequence stopped.
#[derive(Debug)]
pub(crate) enum StepCause {
    Storage(StorageError),
    /// A logged effective entry did not change the store, so the live graph
    /// no longer matches the log.
    Drift(String),
}

/// A step sequence stopped part way.
#[derive(Debug)]
pub(crate) struct StepFailure {
    pub cause: StepCause,
    /// Whether the steps applied before the failure were reverted.
    pub reverted: bool,
}

async fn apply_one(store: &dyn GraphStore, step: Step<'_>) -> Result<bool, StorageError> {
    match step.kind {
        DeltaKind::Insertion => store.insert(step.graph, step.triple).await,
        DeltaKind::Deletion => store.remove(step.graph, step.triple).await,
    }
}

/// Apply steps in order. Every step must change the store. On an error or a
/// step that changes nothing, the already-applied prefix is reverted so the
/// store is left as it was before the call, if possible.
pub(crate) async fn apply_steps(store: &dyn GraphStore, steps: &[Step<'_>]) -> Result<(), StepFailure> {
    for (done, step) in steps.iter().enumerate() {
        let cause = match apply_one(store, *step).await {
            Ok(true) => continue,
            Ok(false) => {
                warn!(
                    graph = %step.graph,
                    triple = %step.triple,
                    kind = ?step.kind,
                    "replayed entry did not change the store; live graph has drifted from the log"
                );
                StepCause::Drift(format!(
                    "{:?} of {} in {} changed nothing",
                    step.kind, step.triple, step.graph
                ))
            }
            Err(source) => StepCause::Storage(source),
        };
        let reverted = revert(store, &steps[..done]).await.is_ok();
        return Err(StepFailure { cause, reverted });
    }
    Ok(())
}

/// Apply steps in order, stopping at the first error. Used for
/// compensation, where there is nothing sensible to fall back to.
pub(crate) async fn run(store: &dyn GraphStore, steps: &[Step<'_>]) -> Result<(), StorageError> {
    for step in steps {
        apply_one(store, *step).await?;
    }
    Ok(())
}

/// Undo already-applied steps, newest first.
pub(crate) async fn revert(store: &dyn GraphStore, applied: &[Step<'_>]) -> Result<(), StorageError> {
    for step in applied.iter().rev() {
        apply_one(store, step.inverse()).await?;
    }
    Ok(())
}
