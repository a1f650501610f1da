use crate::StorageResult;
use async_trait::async_trait;
use trellis_types::{
    ChangeLogEntry, ChangesetId, GraphName, LogAppend, LogKind, Timestamp, Triple, TriplePattern,
    VersionRecord,
};

/// Mutable, named-graph partitioned triple collection.
///
/// The engine only talks to this capability; index layout is the
/// implementor's business. Each graph holds a set: inserting a present
/// triple or removing an absent one is a no-op reported as `false`.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Insert one triple. Returns `true` when the graph changed.
    async fn insert(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool>;

    /// Insert a batch, returning one changed-flag per input triple. Flags
    /// are computed sequentially, so a triple repeated within the batch
    /// reports `true` at most once.
    async fn insert_batch(&self, graph: &GraphName, triples: &[Triple]) -> StorageResult<Vec<bool>> {
        let mut changed = Vec::with_capacity(triples.len());
        for triple in triples {
            changed.push(self.insert(graph, triple).await?);
        }
        Ok(changed)
    }

    /// Remove one triple. Returns `true` when the graph changed.
    async fn remove(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool>;

    async fn contains(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool>;

    /// Current content of one graph in ascending triple order.
    async fn triples(&self, graph: &GraphName) -> StorageResult<Vec<Triple>>;

    /// Names of graphs that currently hold at least one triple.
    async fn graph_names(&self) -> StorageResult<Vec<GraphName>>;

    /// Triples of one graph matching a pattern.
    async fn matching(&self, graph: &GraphName, pattern: &TriplePattern) -> StorageResult<Vec<Triple>> {
        Ok(self
            .triples(graph)
            .await?
            .into_iter()
            .filter(|t| pattern.matches(t))
            .collect())
    }
}

/// The two append-only logs of inverted deltas.
///
/// Entries are never edited in place. They are appended on commit, moved as a
/// whole changeset between `Active` and `Redo`, discarded when a commit rolls
/// back, and the redo log may be cleared.
#[async_trait]
pub trait ChangeLog: Send + Sync {
    /// Append entries to the active log as one unit, assigning sequence
    /// numbers in input order.
    async fn append(&self, entries: &[LogAppend]) -> StorageResult<Vec<ChangeLogEntry>>;

    /// Entries strictly after `after`, optionally for one graph, in
    /// ascending `(timestamp, seq)` order.
    async fn entries_after(
        &self,
        log: LogKind,
        after: Timestamp,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<ChangeLogEntry>>;

    /// All entries of one changeset in ascending `seq` order.
    async fn changeset_entries(
        &self,
        log: LogKind,
        changeset_id: &ChangesetId,
    ) -> StorageResult<Vec<ChangeLogEntry>>;

    /// Distinct changesets in a log, newest first by `(timestamp, seq)`.
    async fn versions(
        &self,
        log: LogKind,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<VersionRecord>>;

    /// Move every entry of a changeset from one log to the other. Either all
    /// entries move or none do. Returns the number moved.
    async fn move_changeset(
        &self,
        changeset_id: &ChangesetId,
        from: LogKind,
        to: LogKind,
    ) -> StorageResult<usize>;

    /// Changesets in the redo log in the order they were moved there, most
    /// recently undone last. Moving a changeset out of the redo log, or
    /// discarding or clearing it, removes it from the stack.
    async fn redo_stack(&self) -> StorageResult<Vec<ChangesetId>>;

    /// Drop every entry of a changeset from a log. Only used to roll back a
    /// commit that never completed.
    async fn discard_changeset(&self, log: LogKind, changeset_id: &ChangesetId)
        -> StorageResult<usize>;

    /// Remove every entry from a log. Returns the number removed.
    async fn clear(&self, log: LogKind) -> StorageResult<usize>;

    /// Number of entries in a log.
    async fn len(&self, log: LogKind) -> StorageResult<usize>;

    async fn is_empty(&self, log: LogKind) -> StorageResult<bool> {
        Ok(self.len(log).await? == 0)
    }
}
