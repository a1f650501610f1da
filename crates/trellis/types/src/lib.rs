//! Core type definitions for Trellis, the temporal layer over a mutable
//! triple dataset.
//!
//! This crate carries only value types. Storage contracts live in
//! `trellis-store` and the transaction engine in `trellis`.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod delta;
pub mod ids;
pub mod term;
pub mod triple;

pub use delta::{ChangeLogEntry, DeltaKind, LogAppend, LogKind, VersionRecord};
pub use ids::{ChangesetId, GraphName, Timestamp};
pub use term::Term;
pub use triple::{Triple, TriplePattern};
