use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::GateConfig;
use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageKind, StageResult, SubmissionProposal};
use crate::stages::{PermissionStage, ReadOnlyStage, ValidationStage};

// ---------------------------------------------------------------------------
// GateResult
// ---------------------------------------------------------------------------

/// Final verdict of the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accepted,
    Rejected {
        stage: String,
        kind: StageKind,
        reason: String,
    },
}

/// The outcome of running a proposal through the full gate pipeline.
#[derive(Clone, Debug)]
pub struct GateResult {
    pub decision: GateDecision,
    /// Per-stage results in evaluation order.
    pub stage_results: Vec<StageResult>,
    /// Total wall-clock time for the pipeline evaluation.
    pub elapsed: Duration,
}

impl GateResult {
    /// Returns `true` if the proposal was accepted.
    pub fn is_accepted(&self) -> bool {
        self.decision == GateDecision::Accepted
    }
}

// ---------------------------------------------------------------------------
// SubmissionGate
// ---------------------------------------------------------------------------

/// An ordered pipeline of stages every submission passes through before
/// the reconciler touches the store.
pub struct SubmissionGate {
    stages: Vec<Box<dyn GateStage>>,
    config: GateConfig,
}

impl SubmissionGate {
    /// Create a gate with an empty pipeline.
    pub fn new(config: GateConfig) -> Self {
        Self {
            stages: Vec::new(),
            config,
        }
    }

    /// Create a gate with the default stage pipeline:
    /// ReadOnly -> Permission -> Validation
    pub fn with_default_stages(config: GateConfig) -> Self {
        let mut gate = Self::new(config);
        gate.add_stage(Box::new(ReadOnlyStage));
        gate.add_stage(Box::new(PermissionStage));
        gate.add_stage(Box::new(ValidationStage));
        gate
    }

    /// Append a stage to the end of the pipeline.
    pub fn add_stage(&mut self, stage: Box<dyn GateStage>) {
        self.stages.push(stage);
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Evaluate a proposal through the full pipeline.
    ///
    /// The pipeline is **fail-fast**: the first stage that fails stops
    /// evaluation and produces a `Rejected` decision.
    pub fn evaluate(&self, proposal: &SubmissionProposal) -> Result<GateResult, GateError> {
        let pipeline_start = Instant::now();
        let mut context = GateContext::new(&self.config);
        let mut stage_results = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let stage_start = Instant::now();
            let decision = stage.evaluate(proposal, &context)?;

            let reason = match &decision {
                StageDecision::Pass => None,
                StageDecision::Fail { reason } => Some(reason.clone()),
            };
            let result = StageResult {
                stage_name: stage.name().to_string(),
                passed: decision.is_pass(),
                reason,
                elapsed: stage_start.elapsed(),
            };
            stage_results.push(result.clone());
            context.previous_stages.push(result);

            if let StageDecision::Fail { reason } = decision {
                debug!(
                    stage = stage.name(),
                    kind = ?proposal.kind,
                    reason = %reason,
                    "submission rejected by gate"
                );
                return Ok(GateResult {
                    decision: GateDecision::Rejected {
                        stage: stage.name().to_string(),
                        kind: stage.kind(),
                        reason,
                    },
                    stage_results,
                    elapsed: pipeline_start.elapsed(),
                });
            }
        }

        Ok(GateResult {
            decision: GateDecision::Accepted,
            stage_results,
            elapsed: pipeline_start.elapsed(),
        })
    }
}
