use crate::error::GateError;
use crate::stage::{GateContext, GateStage, StageDecision, StageKind, SubmissionKind, SubmissionProposal};

/// Structural validation stage.
///
/// Checks coordinates, text limits, and area names, and keeps the fields
/// that only a removal may set out of ordinary reports.
pub struct ValidationStage;

impl GateStage for ValidationStage {
    fn name(&self) -> &str {
        "validation"
    }

    fn kind(&self) -> StageKind {
        StageKind::Validation
    }

    fn evaluate(
        &self,
        proposal: &SubmissionProposal,
        context: &GateContext<'_>,
    ) -> Result<StageDecision, GateError> {
        let config = context.config;
        let fields = &proposal.fields;

        if proposal.kind == SubmissionKind::Removal {
            let reason = proposal.reason.as_deref().unwrap_or_default();
            if reason.trim().is_empty() {
                return Ok(StageDecision::fail("a removal report requires a reason"));
            }
            if reason.chars().count() > config.max_notes_len {
                return Ok(StageDecision::fail(format!(
                    "removal reason exceeds {} characters",
                    config.max_notes_len
                )));
            }
            if proposal.target.is_none() {
                return Ok(StageDecision::fail("a removal report must name the loo to remove"));
            }
            return Ok(StageDecision::Pass);
        }

        match (proposal.kind, proposal.location) {
            (SubmissionKind::New, None) => {
                return Ok(StageDecision::fail("a new toilet requires a location"));
            }
            (_, Some(location)) => {
                if let Err(e) = location.validate() {
                    return Ok(StageDecision::fail(e.to_string()));
                }
            }
            _ => {}
        }

        if fields.geometry.is_some() {
            return Ok(StageDecision::fail(
                "geometry is derived from location and cannot be submitted directly",
            ));
        }
        if fields.active == Some(false) {
            return Ok(StageDecision::fail(
                "loos are deactivated with a removal report, not by setting active to false",
            ));
        }
        if fields.removal_reason.is_some() {
            return Ok(StageDecision::fail(
                "removalReason may only be set by a removal report",
            ));
        }

        if let Some(name) = &fields.name {
            if name.chars().count() > config.max_name_len {
                return Ok(StageDecision::fail(format!(
                    "name exceeds {} characters",
                    config.max_name_len
                )));
            }
        }
        if let Some(notes) = &fields.notes {
            if notes.chars().count() > config.max_notes_len {
                return Ok(StageDecision::fail(format!(
                    "notes exceed {} characters",
                    config.max_notes_len
                )));
            }
        }

        if let Some(areas) = &fields.area {
            if let Some(i) = areas.iter().position(|a| a.name.is_none()) {
                return Ok(StageDecision::fail(format!("area at index {i} has no name")));
            }
        }

        if proposal.kind == SubmissionKind::Edit
            && fields.is_empty()
            && proposal.location.is_none()
        {
            return Ok(StageDecision::fail("an edit report must change at least one field"));
        }

        Ok(StageDecision::Pass)
    }
}
