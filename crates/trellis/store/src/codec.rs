//! Conversion between typed log entries and persisted [`LogRow`]s.

use crate::model::LogRow;
use crate::{StorageError, StorageResult};
use trellis_types::{ChangeLogEntry, ChangesetId, DeltaKind, GraphName, Term, Timestamp, Triple};

pub fn encode_entry(entry: &ChangeLogEntry) -> StorageResult<LogRow> {
    let seq = i64::try_from(entry.seq)
        .map_err(|_| StorageError::InvalidInput(format!("sequence {} out of range", entry.seq)))?;
    Ok(LogRow {
        seq,
        changeset_id: entry.changeset_id.to_string(),
        timestamp: entry.timestamp.value(),
        graph: entry.graph.to_string(),
        is_insertion: entry.kind.is_insertion(),
        effective: entry.effective,
        triple: encode_triple(&entry.triple)?,
    })
}

pub fn decode_entry(row: &LogRow) -> StorageResult<ChangeLogEntry> {
    let seq = u64::try_from(row.seq).map_err(|_| StorageError::MalformedEntry {
        seq: 0,
        reason: format!("negative sequence {}", row.seq),
    })?;
    let changeset_id =
        row.changeset_id
            .parse::<ChangesetId>()
            .map_err(|e| StorageError::MalformedEntry {
                seq,
                reason: format!("bad changeset id {:?}: {e}", row.changeset_id),
            })?;
    let triple = decode_triple(&row.triple).map_err(|reason| StorageError::MalformedEntry {
        seq,
        reason,
    })?;
    Ok(ChangeLogEntry {
        seq,
        changeset_id,
        timestamp: Timestamp(row.timestamp),
        graph: GraphName::new(row.graph.clone()),
        kind: if row.is_insertion {
            DeltaKind::Insertion
        } else {
            DeltaKind::Deletion
        },
        triple,
        effective: row.effective,
    })
}

pub fn encode_triple(triple: &Triple) -> StorageResult<String> {
    serde_json::to_string(&(&triple.subject, &triple.predicate, &triple.object))
        .map_err(|e| StorageError::Encoding(e.to_string()))
}

fn decode_triple(raw: &str) -> Result<Triple, String> {
    let (subject, predicate, object): (Term, Term, Term) =
        serde_json::from_str(raw).map_err(|e| format!("bad triple payload: {e}"))?;
    Ok(Triple {
        subject,
        predicate,
        object,
    })
}
