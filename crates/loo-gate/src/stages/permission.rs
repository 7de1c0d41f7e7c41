use loo_types::REPORT_PERMISSION;

use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageKind, SubmissionProposal};

/// Contributor check.
///
/// When `require_contributor` is set, the submission must come from an
/// identified contributor holding `report:loo`.
pub struct PermissionStage;

impl GateStage for PermissionStage {
    fn name(&self) -> &str {
        "permission"
    }

    fn kind(&self) -> StageKind {
        StageKind::Authorization
    }

    fn evaluate(
        &self,
        proposal: &SubmissionProposal,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        if !context.config.require_contributor {
            return Ok(StageDecision::Pass);
        }

        match &proposal.contributor {
            None => Ok(StageDecision::fail("an identified contributor is required")),
            Some(c) if c.name.trim().is_empty() => {
                Ok(StageDecision::fail("contributor name must not be empty"))
            }
            Some(c) if !c.has_permission(REPORT_PERMISSION) => Ok(StageDecision::fail(format!(
                "contributor '{}' lacks the {REPORT_PERMISSION} permission",
                c.name
            ))),
            Some(_) => Ok(StageDecision::Pass),
        }
    }
}
