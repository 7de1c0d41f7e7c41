use serde::{Deserialize, Serialize};

use loo_types::{Loo, LooId, Report, ReportId};

use crate::error::StoreResult;

/// A report and the updated loo that references it, written as one unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommitBatch {
    pub report: Report,
    pub loo: Loo,
    /// Compare-and-swap token: the loo's latest report id as read by the
    /// caller, or `None` when the loo must not exist yet.
    pub expected_head: Option<ReportId>,
}

/// Read boundary for loo and report lookups.
pub trait LooReader: Send + Sync {
    fn loo(&self, id: &LooId) -> StoreResult<Option<Loo>>;

    fn report(&self, id: &ReportId) -> StoreResult<Option<Report>>;

    /// All loos, ordered by id.
    fn loos(&self) -> StoreResult<Vec<Loo>>;

    /// All reports, ordered by creation time.
    fn reports(&self) -> StoreResult<Vec<Report>>;

    /// History of one loo, oldest first. Empty if the loo does not exist.
    fn loo_reports(&self, id: &LooId) -> StoreResult<Vec<Report>> {
        let Some(loo) = self.loo(id)? else {
            return Ok(vec![]);
        };
        let mut history = Vec::with_capacity(loo.reports.len());
        for report_id in &loo.reports {
            if let Some(report) = self.report(report_id)? {
                history.push(report);
            }
        }
        Ok(history)
    }

    fn loo_count(&self) -> StoreResult<u64> {
        Ok(self.loos()?.len() as u64)
    }

    fn report_count(&self) -> StoreResult<u64> {
        Ok(self.reports()?.len() as u64)
    }
}

/// Write boundary: the only mutation is an atomic commit of a batch.
pub trait LooWriter: Send + Sync {
    /// Persist `batch.report` and `batch.loo` together.
    ///
    /// Fails with `StoreError::Conflict` and writes nothing when the stored
    /// loo's latest report differs from `batch.expected_head`.
    fn commit(&self, batch: &CommitBatch) -> StoreResult<()>;
}

/// A store that can both read and commit.
pub trait LooStore: LooReader + LooWriter {}

impl<T: LooReader + LooWriter + ?Sized> LooStore for T {}
