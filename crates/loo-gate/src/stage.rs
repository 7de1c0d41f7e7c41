use std::time::Duration;

use serde::{Deserialize, Serialize};

use loo_types::{Contributor, Location, LooId, LooProperties, RemovalInput, ReportInput};

use crate::config::GateConfig;
use crate::error::GateError;

// ---------------------------------------------------------------------------
// SubmissionProposal
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    /// A report describing a toilet not yet on the map.
    New,
    /// An ordinary report against an existing loo.
    Edit,
    /// A report taking an existing loo off the map.
    Removal,
}

/// A submission as seen by the gate, after normalisation and before any
/// store access.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionProposal {
    pub kind: SubmissionKind,
    pub target: Option<LooId>,
    pub location: Option<Location>,
    /// Submitted property fields. Empty for removals.
    pub fields: LooProperties,
    /// Removal reason. Present only for removals.
    pub reason: Option<String>,
    pub contributor: Option<Contributor>,
}

impl SubmissionProposal {
    /// Proposal for an add/edit report; `target` decides which of the two it is.
    pub fn from_report(
        input: &ReportInput,
        target: Option<LooId>,
        contributor: Option<&Contributor>,
    ) -> Self {
        Self {
            kind: if target.is_some() {
                SubmissionKind::Edit
            } else {
                SubmissionKind::New
            },
            target,
            location: input.location,
            fields: input.fields.clone(),
            reason: None,
            contributor: contributor.cloned(),
        }
    }

    pub fn from_removal(input: &RemovalInput, contributor: Option<&Contributor>) -> Self {
        Self {
            kind: SubmissionKind::Removal,
            target: Some(input.edit),
            location: None,
            fields: LooProperties::default(),
            reason: Some(input.reason.clone()),
            contributor: contributor.cloned(),
        }
    }

    /// Name of the submitting contributor, if any.
    pub fn contributor_name(&self) -> Option<&str> {
        self.contributor.as_ref().map(|c| c.name.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageDecision
// ---------------------------------------------------------------------------

/// The outcome of a single gate stage evaluation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageDecision {
    /// The stage passed; proceed to the next stage.
    Pass,
    /// The stage failed; the submission is rejected.
    Fail { reason: String },
}

impl StageDecision {
    pub fn fail(reason: impl Into<String>) -> Self {
        Self::Fail {
            reason: reason.into(),
        }
    }

    /// Returns `true` if the decision is `Pass`.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    /// Returns `true` if the decision is `Fail`.
    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail { .. })
    }
}

/// What a failing stage says about the submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    /// The caller may not submit.
    Authorization,
    /// The payload is malformed.
    Validation,
}

// ---------------------------------------------------------------------------
// StageResult
// ---------------------------------------------------------------------------

/// Recorded result from a completed stage evaluation.
#[derive(Clone, Debug)]
pub struct StageResult {
    pub stage_name: String,
    pub passed: bool,
    /// Populated on failure.
    pub reason: Option<String>,
    /// Wall-clock time the stage took to evaluate.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// GateContext
// ---------------------------------------------------------------------------

/// Contextual information available to every gate stage.
pub struct GateContext<'a> {
    pub config: &'a GateConfig,
    /// Results from stages that have already run in this evaluation.
    pub previous_stages: Vec<StageResult>,
}

impl<'a> GateContext<'a> {
    pub fn new(config: &'a GateConfig) -> Self {
        Self {
            config,
            previous_stages: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// GateStage trait
// ---------------------------------------------------------------------------

/// A single evaluation stage in the gate pipeline.
///
/// The trait is object-safe and `Send + Sync` so stages can be stored in
/// a `Vec<Box<dyn GateStage>>`.
pub trait GateStage: Send + Sync {
    /// Human-readable name of this stage (e.g., "validation", "permission").
    fn name(&self) -> &str;

    /// How a failure of this stage is reported to the caller.
    fn kind(&self) -> StageKind;

    /// Evaluate the proposal and return a decision.
    fn evaluate(
        &self,
        proposal: &SubmissionProposal,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError>;
}
