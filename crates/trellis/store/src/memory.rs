//! In-memory reference implementations of the storage traits.
//!
//! Deterministic and test-friendly. The change log keeps rows in their
//! persisted shape so decoding behaves exactly like a durable backend.

use crate::codec::{decode_entry, encode_entry};
use crate::model::LogRow;
use crate::traits::{ChangeLog, GraphStore};
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;
use trellis_types::{
    ChangeLogEntry, ChangesetId, GraphName, LogAppend, LogKind, Timestamp, Triple, VersionRecord,
};

/// In-memory named-graph triple store.
#[derive(Default)]
pub struct InMemoryGraphStore {
    graphs: RwLock<BTreeMap<GraphName, BTreeSet<Triple>>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn insert(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool> {
        let mut guard = self
            .graphs
            .write()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        Ok(guard.entry(graph.clone()).or_default().insert(triple.clone()))
    }

    async fn insert_batch(&self, graph: &GraphName, triples: &[Triple]) -> StorageResult<Vec<bool>> {
        let mut guard = self
            .graphs
            .write()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        let set = guard.entry(graph.clone()).or_default();
        Ok(triples.iter().map(|t| set.insert(t.clone())).collect())
    }

    async fn remove(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool> {
        let mut guard = self
            .graphs
            .write()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        let Some(set) = guard.get_mut(graph) else {
            return Ok(false);
        };
        let removed = set.remove(triple);
        if set.is_empty() {
            guard.remove(graph);
        }
        Ok(removed)
    }

    async fn contains(&self, graph: &GraphName, triple: &Triple) -> StorageResult<bool> {
        let guard = self
            .graphs
            .read()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        Ok(guard.get(graph).is_some_and(|set| set.contains(triple)))
    }

    async fn triples(&self, graph: &GraphName) -> StorageResult<Vec<Triple>> {
        let guard = self
            .graphs
            .read()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        Ok(guard
            .get(graph)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn graph_names(&self) -> StorageResult<Vec<GraphName>> {
        let guard = self
            .graphs
            .read()
            .map_err(|_| StorageError::Backend("graph lock poisoned".to_string()))?;
        Ok(guard.keys().cloned().collect())
    }
}

#[derive(Default)]
struct LogState {
    next_seq: u64,
    active: Vec<LogRow>,
    redo: Vec<LogRow>,
    /// Undo order of the changesets held in `redo`.
    redo_stack: Vec<ChangesetId>,
}

impl LogState {
    fn rows(&self, log: LogKind) -> &Vec<LogRow> {
        match log {
            LogKind::Active => &self.active,
            LogKind::Redo => &self.redo,
        }
    }

    fn rows_mut(&mut self, log: LogKind) -> &mut Vec<LogRow> {
        match log {
            LogKind::Active => &mut self.active,
            LogKind::Redo => &mut self.redo,
        }
    }

    fn unstack(&mut self, changeset_id: &ChangesetId) {
        self.redo_stack.retain(|id| id != changeset_id);
    }
}

/// In-memory active/redo change log.
#[derive(Default)]
pub struct InMemoryChangeLog {
    state: RwLock<LogState>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw rows of one log in storage order, e.g. for export.
    pub fn export_rows(&self, log: LogKind) -> StorageResult<Vec<LogRow>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        Ok(guard.rows(log).clone())
    }

    /// Load previously exported rows as-is. Rows are not validated here;
    /// corrupt rows surface as `MalformedEntry` when read.
    pub fn import_rows(&self, log: LogKind, rows: Vec<LogRow>) -> StorageResult<()> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        for row in &rows {
            if row.seq < 0 {
                return Err(StorageError::InvalidInput(format!(
                    "negative sequence {}",
                    row.seq
                )));
            }
        }
        let max_seq = rows.iter().map(|r| r.seq as u64).max();
        if let Some(max_seq) = max_seq {
            guard.next_seq = guard.next_seq.max(max_seq + 1);
        }
        if log == LogKind::Redo {
            // Rows with an unparsable id stay unstacked and fail when read.
            for id in rows.iter().filter_map(|r| r.changeset_id.parse::<ChangesetId>().ok()) {
                if !guard.redo_stack.contains(&id) {
                    guard.redo_stack.push(id);
                }
            }
        }
        guard.rows_mut(log).extend(rows);
        Ok(())
    }
}

#[async_trait]
impl ChangeLog for InMemoryChangeLog {
    async fn append(&self, entries: &[LogAppend]) -> StorageResult<Vec<ChangeLogEntry>> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;

        // Encode everything before touching the log so a failure appends nothing.
        let mut seq = guard.next_seq;
        let mut stored = Vec::with_capacity(entries.len());
        let mut rows = Vec::with_capacity(entries.len());
        for append in entries {
            let entry = ChangeLogEntry::from_append(seq, append.clone());
            rows.push(encode_entry(&entry)?);
            stored.push(entry);
            seq += 1;
        }

        guard.next_seq = seq;
        guard.active.extend(rows);
        Ok(stored)
    }

    async fn entries_after(
        &self,
        log: LogKind,
        after: Timestamp,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<ChangeLogEntry>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        let mut entries = guard
            .rows(log)
            .iter()
            .filter(|row| row.timestamp > after.value())
            .filter(|row| graph.map_or(true, |g| row.graph == g.as_str()))
            .map(decode_entry)
            .collect::<StorageResult<Vec<_>>>()?;
        entries.sort_by_key(ChangeLogEntry::replay_key);
        Ok(entries)
    }

    async fn changeset_entries(
        &self,
        log: LogKind,
        changeset_id: &ChangesetId,
    ) -> StorageResult<Vec<ChangeLogEntry>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        let id = changeset_id.to_string();
        let mut entries = guard
            .rows(log)
            .iter()
            .filter(|row| row.changeset_id == id)
            .map(decode_entry)
            .collect::<StorageResult<Vec<_>>>()?;
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    async fn versions(
        &self,
        log: LogKind,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<VersionRecord>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;

        let mut heads: HashMap<&str, (&LogRow, i64)> = HashMap::new();
        for row in guard.rows(log) {
            if graph.is_some_and(|g| row.graph != g.as_str()) {
                continue;
            }
            heads
                .entry(row.changeset_id.as_str())
                .and_modify(|(_, max_seq)| *max_seq = (*max_seq).max(row.seq))
                .or_insert((row, row.seq));
        }

        let mut versions = heads
            .into_values()
            .map(|(row, max_seq)| {
                let changeset_id = row.changeset_id.parse::<ChangesetId>().map_err(|e| {
                    StorageError::MalformedEntry {
                        seq: row.seq.max(0) as u64,
                        reason: format!("bad changeset id {:?}: {e}", row.changeset_id),
                    }
                })?;
                Ok((
                    VersionRecord {
                        changeset_id,
                        graph: GraphName::new(row.graph.clone()),
                        timestamp: Timestamp(row.timestamp),
                    },
                    max_seq,
                ))
            })
            .collect::<StorageResult<Vec<_>>>()?;
        versions.sort_by(|(a, a_seq), (b, b_seq)| {
            (b.timestamp, b_seq).cmp(&(a.timestamp, a_seq))
        });
        Ok(versions.into_iter().map(|(v, _)| v).collect())
    }

    async fn move_changeset(
        &self,
        changeset_id: &ChangesetId,
        from: LogKind,
        to: LogKind,
    ) -> StorageResult<usize> {
        if from == to {
            return Err(StorageError::InvalidInput(format!(
                "cannot move changeset {changeset_id} from {from} log to itself"
            )));
        }
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        let id = changeset_id.to_string();
        let (moved, kept): (Vec<_>, Vec<_>) = std::mem::take(guard.rows_mut(from))
            .into_iter()
            .partition(|row| row.changeset_id == id);
        *guard.rows_mut(from) = kept;
        if moved.is_empty() {
            return Err(StorageError::ChangesetNotFound {
                changeset: *changeset_id,
                log: from,
            });
        }
        let count = moved.len();
        guard.rows_mut(to).extend(moved);
        guard.unstack(changeset_id);
        if to == LogKind::Redo {
            guard.redo_stack.push(*changeset_id);
        }
        Ok(count)
    }

    async fn redo_stack(&self) -> StorageResult<Vec<ChangesetId>> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        Ok(guard.redo_stack.clone())
    }

    async fn discard_changeset(
        &self,
        log: LogKind,
        changeset_id: &ChangesetId,
    ) -> StorageResult<usize> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        let id = changeset_id.to_string();
        let rows = guard.rows_mut(log);
        let before = rows.len();
        rows.retain(|row| row.changeset_id != id);
        let discarded = before - rows.len();
        if log == LogKind::Redo {
            guard.unstack(changeset_id);
        }
        Ok(discarded)
    }

    async fn clear(&self, log: LogKind) -> StorageResult<usize> {
        let mut guard = self
            .state
            .write()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        if log == LogKind::Redo {
            guard.redo_stack.clear();
        }
        Ok(std::mem::take(guard.rows_mut(log)).len())
    }

    async fn len(&self, log: LogKind) -> StorageResult<usize> {
        let guard = self
            .state
            .read()
            .map_err(|_| StorageError::Backend("changelog lock poisoned".to_string()))?;
        Ok(guard.rows(log).len())
    }
}
