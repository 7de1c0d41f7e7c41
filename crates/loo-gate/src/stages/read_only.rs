use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageKind, SubmissionProposal};

/// Rejects every submission while the service is in read-only mode.
pub struct ReadOnlyStage;

impl GateStage for ReadOnlyStage {
    fn name(&self) -> &str {
        "read-only"
    }

    fn kind(&self) -> StageKind {
        StageKind::Authorization
    }

    fn evaluate(
        &self,
        _proposal: &SubmissionProposal,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if context.config.read_only {
            return Ok(StageDecision::fail(
                "the service is in read-only mode; submissions are disabled",
            ));
        }
        Ok(StageDecision::Pass)
    }
}
