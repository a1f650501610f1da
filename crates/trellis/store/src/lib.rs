//! Trellis storage contracts.
//!
//! This crate defines the two capabilities the transaction engine works
//! against:
//! - [`GraphStore`]: the live, named-graph partitioned triple collection
//! - [`ChangeLog`]: the append-only active and redo logs of inverted deltas
//!
//! In-memory adapters are always available. A SQLite change log is provided
//! behind the `sqlite` feature.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

pub mod codec;
mod error;
pub mod memory;
mod model;
#[cfg(feature = "sqlite")]
pub mod sqlite;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryChangeLog, InMemoryGraphStore};
pub use model::LogRow;
pub use traits::{ChangeLog, GraphStore};
