//! Report reconciler for the Toilet Map.
//!
//! The only write path into the store. A submission is normalised, run
//! through the submission gate, turned into an immutable [`Report`] and an
//! updated [`Loo`], and committed as one compare-and-swap batch.
//!
//! [`Report`]: loo_types::Report
//! [`Loo`]: loo_types::Loo

pub mod error;
pub mod reconciler;

pub use error::{ReconcileError, ReconcileResult};
pub use reconciler::Reconciler;
