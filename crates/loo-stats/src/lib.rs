//! Read-only statistics over the Toilet Map store.
//!
//! Aggregations are pure functions over a snapshot of loos and reports
//! ([`aggregate`]); [`StatsService`] takes the snapshot from any
//! [`LooReader`](loo_store::LooReader), retrying transient read failures.

pub mod aggregate;
pub mod error;
pub mod scope;
pub mod service;

pub use aggregate::{AreaCounter, Counters, Proportion, ProportionCounters, Proportions};
pub use error::{StatsError, StatsResult};
pub use scope::{ScopeParams, StatsScope, UNKNOWN_AREA};
pub use service::{StatsConfig, StatsService};
