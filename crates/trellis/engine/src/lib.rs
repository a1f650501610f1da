//! Trellis: a temporal layer over a mutable triple dataset.
//!
//! Every committed changeset is recorded in an append-only change log as
//! *inverted* deltas: a staged addition is logged as a deletion and a staged
//! removal as an insertion. Replaying entries as stored walks the dataset
//! back in time; replaying their inverse walks it forward again. On top of
//! that log the [`Dataset`] handle provides:
//!
//! - atomic commits with precommit (veto) and postcommit (report) hooks
//! - point-in-time reconstruction with [`Dataset::graph_at`]
//! - undo/redo across an active log and a redo log
//! - a version index of committed changesets
//!
//! ```no_run
//! # async fn demo() -> trellis::TrellisResult<()> {
//! use trellis::{Dataset, Term, Timestamp, Triple};
//!
//! let dataset = Dataset::in_memory();
//! let mut cs = dataset.new_changeset("urn:bldg", Some(Timestamp::logical(1)));
//! cs.add(Triple::new(
//!     Term::iri("urn:bldg#vav1"),
//!     Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type"),
//!     Term::iri("https://brickschema.org/schema/Brick#VAV"),
//! ));
//! dataset.commit(cs).await?;
//!
//! dataset.undo().await?;
//! assert!(dataset.is_empty().await?);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod changeset;
pub mod config;
mod dataset;
pub mod error;
mod history;
pub mod hooks;
mod namespace;
mod replay;
mod snapshot;
mod transaction;
mod versions;

pub use changeset::{Changeset, ChangesetRecord, CommitReceipt};
pub use config::{EngineConfig, RedoOrder};
pub use dataset::{Dataset, GraphView};
pub use error::{HookFailure, TrellisError, TrellisResult};
pub use hooks::{hook_fn, CommitHook, FnHook, HookContext, HookRegistry};
pub use namespace::NamespaceMap;
pub use snapshot::Snapshot;

pub use trellis_store::{
    ChangeLog, GraphStore, InMemoryChangeLog, InMemoryGraphStore, LogRow, StorageError,
    StorageResult,
};
pub use trellis_types::{
    ChangeLogEntry, ChangesetId, DeltaKind, GraphName, LogAppend, LogKind, Term, Timestamp,
    Triple, TriplePattern, VersionRecord,
};

#[cfg(feature = "sqlite")]
pub use trellis_store::sqlite::SqliteChangeLog;
