//! Entity store for the Toilet Map.
//!
//! Two collections live here: loos (current-state projections) and reports
//! (immutable history). This crate provides:
//! - `LooReader` / `LooWriter` trait boundaries
//! - `InMemoryLooStore` for tests and embedding
//! - `DurableLooStore`, which logs every committed batch to a CRC-framed WAL
//! - History validation (previous links, ordering, orphans, projection)
//! - Deterministic replay of a loo's report diffs
//!
//! # Design Rules
//!
//! 1. Reports are never mutated or deleted once committed.
//! 2. A report and the loo that references it are committed together or not at all.
//! 3. Commits are compare-and-swap on the loo's latest report id.

pub mod durable;
pub mod error;
pub mod memory;
pub mod replay;
pub mod traits;
pub mod validation;
pub mod wal;

#[cfg(test)]
mod testing;

pub use durable::DurableLooStore;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryLooStore;
pub use replay::{ReplayEngine, ReplayResult};
pub use traits::{CommitBatch, LooReader, LooStore, LooWriter};
pub use validation::{HistoryReport, HistoryValidator, Violation, ViolationKind};
pub use wal::{SyncMode, WalConfig, WriteAheadLog};
