//! SQLite change log.
//!
//! Both logs are tables of identical shape (`changelog`, `redo_log`).
//! `redo_stack` records the order in which changesets entered the redo log.
//! Appends and changeset moves run inside one SQL transaction each.

use crate::codec::{decode_entry, encode_entry};
use crate::model::LogRow;
use crate::traits::ChangeLog;
use crate::{StorageError, StorageResult};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Acquire, Row};
use trellis_types::{
    ChangeLogEntry, ChangesetId, GraphName, LogAppend, LogKind, Timestamp, VersionRecord,
};

const COLUMNS: &str = "seq, changeset_id, timestamp, graph, is_insertion, effective, triple";

/// SQLite-backed active/redo change log.
#[derive(Clone)]
pub struct SqliteChangeLog {
    pool: SqlitePool,
}

impl SqliteChangeLog {
    /// Connect and initialise the schema. A single connection is used: the
    /// engine has one writer and `sqlite::memory:` databases are
    /// per-connection.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to connect sqlite: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create adapter from an existing pool.
    pub async fn from_pool(pool: SqlitePool) -> StorageResult<Self> {
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init_schema(&self) -> StorageResult<()> {
        for log in [LogKind::Active, LogKind::Redo] {
            let table = table(log);
            let ddl = [
                format!(
                    r#"
                    CREATE TABLE IF NOT EXISTS {table} (
                        seq INTEGER PRIMARY KEY,
                        changeset_id TEXT NOT NULL,
                        timestamp INTEGER NOT NULL,
                        graph TEXT NOT NULL,
                        is_insertion BOOLEAN NOT NULL,
                        effective BOOLEAN NOT NULL,
                        triple TEXT NOT NULL
                    )
                    "#
                ),
                format!("CREATE INDEX IF NOT EXISTS {table}_changeset ON {table} (changeset_id)"),
                format!("CREATE INDEX IF NOT EXISTS {table}_time ON {table} (graph, timestamp)"),
            ];
            for stmt in ddl {
                sqlx::query(&stmt)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
            }
        }

        let stack_ddl = [
            r#"
            CREATE TABLE IF NOT EXISTS redo_stack (
                position INTEGER PRIMARY KEY AUTOINCREMENT,
                changeset_id TEXT NOT NULL UNIQUE
            )
            "#,
            // Redo rows written without a stack entry are stacked newest
            // timestamp first, so the oldest one is redone first.
            r#"
            INSERT OR IGNORE INTO redo_stack (changeset_id)
            SELECT changeset_id FROM redo_log
             GROUP BY changeset_id
             ORDER BY MAX(timestamp) DESC, MAX(seq) DESC
            "#,
        ];
        for stmt in stack_ddl {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(format!("schema init failed: {e}")))?;
        }
        Ok(())
    }

    /// Insert a raw row without validation, for restoring exported logs.
    pub async fn insert_row(&self, log: LogKind, row: &LogRow) -> StorageResult<()> {
        sqlx::query(&format!(
            "INSERT INTO {} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            table(log)
        ))
        .bind(row.seq)
        .bind(&row.changeset_id)
        .bind(row.timestamp)
        .bind(&row.graph)
        .bind(row.is_insertion)
        .bind(row.effective)
        .bind(&row.triple)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_conflict)?;
        if log == LogKind::Redo {
            sqlx::query("INSERT OR IGNORE INTO redo_stack (changeset_id) VALUES (?1)")
                .bind(&row.changeset_id)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[async_trait]
impl ChangeLog for SqliteChangeLog {
    async fn append(&self, entries: &[LogAppend]) -> StorageResult<Vec<ChangeLogEntry>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let conn = tx
            .acquire()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let next: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MAX(seq), -1) + 1 FROM (
                SELECT seq FROM changelog UNION ALL SELECT seq FROM redo_log
            )
            "#,
        )
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut stored = Vec::with_capacity(entries.len());
        let mut seq = u64::try_from(next)
            .map_err(|_| StorageError::InvariantViolation(format!("negative sequence {next}")))?;
        let insert = format!(
            "INSERT INTO changelog ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        );
        for append in entries {
            let entry = ChangeLogEntry::from_append(seq, append.clone());
            let row = encode_entry(&entry)?;
            sqlx::query(&insert)
                .bind(row.seq)
                .bind(row.changeset_id)
                .bind(row.timestamp)
                .bind(row.graph)
                .bind(row.is_insertion)
                .bind(row.effective)
                .bind(row.triple)
                .execute(&mut *conn)
                .await
                .map_err(map_sqlx_conflict)?;
            stored.push(entry);
            seq += 1;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(stored)
    }

    async fn entries_after(
        &self,
        log: LogKind,
        after: Timestamp,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<ChangeLogEntry>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}
              FROM {}
             WHERE timestamp > ?1
               AND (?2 IS NULL OR graph = ?2)
             ORDER BY timestamp ASC, seq ASC
            "#,
            table(log)
        ))
        .bind(after.value())
        .bind(graph.map(|g| g.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn changeset_entries(
        &self,
        log: LogKind,
        changeset_id: &ChangesetId,
    ) -> StorageResult<Vec<ChangeLogEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM {} WHERE changeset_id = ?1 ORDER BY seq ASC",
            table(log)
        ))
        .bind(changeset_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn versions(
        &self,
        log: LogKind,
        graph: Option<&GraphName>,
    ) -> StorageResult<Vec<VersionRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT changeset_id, graph, timestamp, MAX(seq) AS head
              FROM {}
             WHERE (?1 IS NULL OR graph = ?1)
             GROUP BY changeset_id, graph, timestamp
             ORDER BY timestamp DESC, head DESC
            "#,
            table(log)
        ))
        .bind(graph.map(|g| g.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?;

        rows.into_iter()
            .map(|row| {
                let head: i64 = row
                    .try_get("head")
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                let raw_id: String = row
                    .try_get("changeset_id")
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                let changeset_id =
                    raw_id
                        .parse::<ChangesetId>()
                        .map_err(|e| StorageError::MalformedEntry {
                            seq: head.max(0) as u64,
                            reason: format!("bad changeset id {raw_id:?}: {e}"),
                        })?;
                Ok(VersionRecord {
                    changeset_id,
                    graph: GraphName::new(
                        row.try_get::<String, _>("graph")
                            .map_err(|e| StorageError::Backend(e.to_string()))?,
                    ),
                    timestamp: Timestamp(
                        row.try_get("timestamp")
                            .map_err(|e| StorageError::Backend(e.to_string()))?,
                    ),
                })
            })
            .collect()
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
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let conn = tx
            .acquire()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let copied = sqlx::query(&format!(
            "INSERT INTO {} ({COLUMNS}) SELECT {COLUMNS} FROM {} WHERE changeset_id = ?1",
            table(to),
            table(from)
        ))
        .bind(changeset_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_conflict)?
        .rows_affected();

        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE changeset_id = ?1",
            table(from)
        ))
        .bind(changeset_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
        .rows_affected();

        if copied == 0 {
            return Err(StorageError::ChangesetNotFound {
                changeset: *changeset_id,
                log: from,
            });
        }
        if copied != deleted {
            return Err(StorageError::InvariantViolation(format!(
                "moved {copied} rows of changeset {changeset_id} but deleted {deleted}"
            )));
        }

        // REPLACE drops an existing entry, so the id always lands on top.
        let stack = if to == LogKind::Redo {
            "INSERT OR REPLACE INTO redo_stack (changeset_id) VALUES (?1)"
        } else {
            "DELETE FROM redo_stack WHERE changeset_id = ?1"
        };
        sqlx::query(stack)
            .bind(changeset_id.to_string())
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        to_usize(copied)
    }

    async fn redo_stack(&self) -> StorageResult<Vec<ChangesetId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT changeset_id FROM redo_stack ORDER BY position ASC")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        ids.into_iter()
            .map(|raw| {
                raw.parse::<ChangesetId>().map_err(|e| {
                    StorageError::InvariantViolation(format!("bad redo stack id {raw:?}: {e}"))
                })
            })
            .collect()
    }

    async fn discard_changeset(
        &self,
        log: LogKind,
        changeset_id: &ChangesetId,
    ) -> StorageResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let conn = tx
            .acquire()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let deleted = sqlx::query(&format!(
            "DELETE FROM {} WHERE changeset_id = ?1",
            table(log)
        ))
        .bind(changeset_id.to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| StorageError::Backend(e.to_string()))?
        .rows_affected();
        if log == LogKind::Redo {
            sqlx::query("DELETE FROM redo_stack WHERE changeset_id = ?1")
                .bind(changeset_id.to_string())
                .execute(&mut *conn)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        to_usize(deleted)
    }

    async fn clear(&self, log: LogKind) -> StorageResult<usize> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let conn = tx
            .acquire()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let deleted = sqlx::query(&format!("DELETE FROM {}", table(log)))
            .execute(&mut *conn)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?
            .rows_affected();
        if log == LogKind::Redo {
            sqlx::query("DELETE FROM redo_stack")
                .execute(&mut *conn)
                .await
                .map_err(|e| StorageError::Backend(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        to_usize(deleted)
    }

    async fn len(&self, log: LogKind) -> StorageResult<usize> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table(log)))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        usize::try_from(count)
            .map_err(|_| StorageError::InvariantViolation(format!("negative row count {count}")))
    }
}

fn table(log: LogKind) -> &'static str {
    match log {
        LogKind::Active => "changelog",
        LogKind::Redo => "redo_log",
    }
}

fn row_to_entry(row: &SqliteRow) -> StorageResult<ChangeLogEntry> {
    let raw = LogRow {
        seq: row
            .try_get("seq")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        changeset_id: row
            .try_get("changeset_id")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        timestamp: row
            .try_get("timestamp")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        graph: row
            .try_get("graph")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        is_insertion: row
            .try_get("is_insertion")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        effective: row
            .try_get("effective")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
        triple: row
            .try_get("triple")
            .map_err(|e| StorageError::Backend(e.to_string()))?,
    };
    decode_entry(&raw)
}

fn map_sqlx_conflict(err: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return StorageError::SequenceConflict(db_err.message().to_string());
        }
    }
    StorageError::Backend(err.to_string())
}

fn to_usize(value: u64) -> StorageResult<usize> {
    usize::try_from(value)
        .map_err(|_| StorageError::InvariantViolation(format!("row count {value} too large")))
}
