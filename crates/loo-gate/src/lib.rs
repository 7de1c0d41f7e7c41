//! Submission gate for the Toilet Map.
//!
//! Every report must pass through the gate before the reconciler reads or
//! writes the store. The gate runs an explicit, ordered pipeline of stages
//! (read-only, permission, validation) and produces an accept/reject
//! decision with per-stage results.
//!
//! # Quick Start
//!
//! ```rust
//! use loo_gate::{GateConfig, SubmissionGate, SubmissionProposal};
//! use loo_types::{Contributor, Location, LooProperties, ReportInput};
//!
//! let gate = SubmissionGate::with_default_stages(GateConfig::default());
//! let input = ReportInput::new_loo(Location::new(51.5, -0.1), LooProperties::default());
//! let alice = Contributor::reporter("alice");
//! let proposal = SubmissionProposal::from_report(&input, None, Some(&alice));
//! let result = gate.evaluate(&proposal).unwrap();
//! assert!(result.is_accepted());
//! ```

pub mod config;
pub mod error;
pub mod gate;
pub mod stage;
pub mod stages;

pub use config::GateConfig;
pub use error::GateError;
pub use gate::{GateDecision, GateResult, SubmissionGate};
pub use stage::{
    GateContext, GateStage, StageDecision, StageKind, StageResult, SubmissionKind,
    SubmissionProposal,
};
pub use stages::{PermissionStage, ReadOnlyStage, ValidationStage};
