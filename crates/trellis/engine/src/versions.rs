use crate::error::TrellisResult;
use crate::Dataset;
use std::collections::HashMap;
use trellis_types::{ChangesetId, GraphName, LogKind, VersionRecord};

impl Dataset {
    /// Committed (not undone) changesets, newest first. Each changeset
    /// appears once. With a graph, only changesets that touched it.
    pub async fn versions(&self, graph: Option<&GraphName>) -> TrellisResult<Vec<VersionRecord>> {
        Ok(self.log.versions(LogKind::Active, graph).await?)
    }

    /// Undone changesets waiting in the redo log, most recently undone
    /// first.
    pub async fn redo_versions(&self) -> TrellisResult<Vec<VersionRecord>> {
        let mut records: HashMap<ChangesetId, VersionRecord> = self
            .log
            .versions(LogKind::Redo, None)
            .await?
            .into_iter()
            .map(|v| (v.changeset_id, v))
            .collect();
        let stack = self.log.redo_stack().await?;
        Ok(stack.iter().rev().filter_map(|id| records.remove(id)).collect())
    }
}
