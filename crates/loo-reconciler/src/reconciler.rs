use std::sync::Arc;

use tracing::{info, warn};

use loo_gate::{GateConfig, GateDecision, StageKind, SubmissionGate, SubmissionProposal};
use loo_store::{CommitBatch, LooStore, StoreError};
use loo_types::{
    next_timestamp, Contributor, Loo, LooId, LooProperties, Point, RemovalInput, Report,
    ReportId, ReportInput, SCHEMA_VERSION,
};

use crate::error::{ReconcileError, ReconcileResult};

/// Applies submissions to a loo store.
///
/// Holds an explicitly constructed store handle; the caller owns its
/// lifecycle.
pub struct Reconciler<S: ?Sized> {
    store: Arc<S>,
    gate: SubmissionGate,
}

impl<S: LooStore + ?Sized> Reconciler<S> {
    pub fn new(store: Arc<S>, gate: SubmissionGate) -> Self {
        Self { store, gate }
    }

    /// Reconciler with the default gate pipeline.
    pub fn with_config(store: Arc<S>, config: GateConfig) -> Self {
        Self::new(store, SubmissionGate::with_default_stages(config))
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn gate(&self) -> &SubmissionGate {
        &self.gate
    }

    /// Add a new toilet (`target` and `input.edit` both absent) or edit an
    /// existing one. An explicit `target` wins over `input.edit`.
    pub fn submit_report(
        &self,
        input: ReportInput,
        contributor: Option<&Contributor>,
        target: Option<LooId>,
    ) -> ReconcileResult<(Report, Loo)> {
        let input = input.normalized();
        let target = target.or(input.edit);
        self.admit(&SubmissionProposal::from_report(&input, target, contributor))?;

        let ReportInput {
            location,
            fields: mut diff,
            ..
        } = input;

        match target {
            None => {
                let location = location.ok_or_else(|| {
                    ReconcileError::Validation("a new toilet requires a location".into())
                })?;
                diff.geometry = Some(Point::from(location));
                diff.active = Some(true);
                self.create(diff, contributor)
            }
            Some(id) => {
                let current = self.load(&id)?;
                if let Some(location) = location {
                    diff.geometry = Some(Point::from(location));
                }
                self.append(current, diff, contributor)
            }
        }
    }

    /// Take a loo off the map. The diff records the reason and pins the
    /// loo's existing geometry.
    pub fn submit_removal(
        &self,
        input: RemovalInput,
        contributor: Option<&Contributor>,
    ) -> ReconcileResult<(Report, Loo)> {
        let input = input.normalized();
        self.admit(&SubmissionProposal::from_removal(&input, contributor))?;

        let current = self.load(&input.edit)?;
        let diff = LooProperties {
            active: Some(false),
            removal_reason: Some(input.reason),
            geometry: current.properties.geometry,
            ..Default::default()
        };
        self.append(current, diff, contributor)
    }

    fn admit(&self, proposal: &SubmissionProposal) -> ReconcileResult<()> {
        match self.gate.evaluate(proposal)?.decision {
            GateDecision::Accepted => Ok(()),
            GateDecision::Rejected {
                kind: StageKind::Authorization,
                reason,
                ..
            } => Err(ReconcileError::Authorization(reason)),
            GateDecision::Rejected {
                kind: StageKind::Validation,
                reason,
                ..
            } => Err(ReconcileError::Validation(reason)),
        }
    }

    fn load(&self, id: &LooId) -> ReconcileResult<Loo> {
        self.store.loo(id)?.ok_or(ReconcileError::NotFound(*id))
    }

    fn create(
        &self,
        diff: LooProperties,
        contributor: Option<&Contributor>,
    ) -> ReconcileResult<(Report, Loo)> {
        let created_at = next_timestamp(None);
        let report = Report {
            id: ReportId::new(),
            schema_version: SCHEMA_VERSION,
            loo: LooId::new(),
            diff,
            previous: None,
            contributor: contributor_name(contributor),
            created_at,
        };
        let loo = Loo {
            id: report.loo,
            schema_version: SCHEMA_VERSION,
            properties: report.diff.clone(),
            reports: vec![report.id],
            created_at,
            updated_at: created_at,
        };
        self.commit(CommitBatch {
            report,
            loo,
            expected_head: None,
        })
    }

    fn append(
        &self,
        current: Loo,
        diff: LooProperties,
        contributor: Option<&Contributor>,
    ) -> ReconcileResult<(Report, Loo)> {
        let head = current.latest_report();
        let created_at = next_timestamp(Some(current.updated_at));
        let report = Report {
            id: ReportId::new(),
            schema_version: SCHEMA_VERSION,
            loo: current.id,
            diff,
            previous: head,
            contributor: contributor_name(contributor),
            created_at,
        };

        let mut loo = current;
        loo.properties.merge(&report.diff);
        loo.reports.push(report.id);
        loo.updated_at = created_at;

        self.commit(CommitBatch {
            report,
            loo,
            expected_head: head,
        })
    }

    fn commit(&self, batch: CommitBatch) -> ReconcileResult<(Report, Loo)> {
        if let Err(e) = self.store.commit(&batch) {
            if matches!(e, StoreError::Conflict { .. }) {
                warn!(
                    loo = %batch.loo.id,
                    report = %batch.report.id,
                    error = %e,
                    "report lost a concurrent write"
                );
            }
            return Err(e.into());
        }

        info!(
            loo = %batch.loo.id,
            report = %batch.report.id,
            removal = batch.report.is_removal(),
            fields = ?batch.report.diff.present_fields(),
            "report committed"
        );
        Ok((batch.report, batch.loo))
    }
}

fn contributor_name(contributor: Option<&Contributor>) -> Option<String> {
    contributor
        .map(|c| c.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
