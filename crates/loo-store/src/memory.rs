use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use loo_types::{Loo, LooId, Report, ReportId};

use crate::error::{StoreError, StoreResult};
use crate::traits::{CommitBatch, LooReader, LooWriter};

/// In-memory store for tests, local demos, and as the working set of
/// [`DurableLooStore`](crate::DurableLooStore).
#[derive(Default)]
pub struct InMemoryLooStore {
    inner: RwLock<StoreState>,
}

#[derive(Default)]
struct StoreState {
    loos: HashMap<LooId, Loo>,
    reports: HashMap<ReportId, Report>,
}

impl InMemoryLooStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check `batch`, run `persist`, then apply the batch, all under the
    /// write lock. Nothing is applied if the check or `persist` fails.
    pub(crate) fn commit_with<F>(&self, batch: &CommitBatch, persist: F) -> StoreResult<()>
    where
        F: FnOnce(&CommitBatch) -> StoreResult<()>,
    {
        let mut state = self.write()?;
        check_batch(&state, batch)?;
        persist(batch)?;
        state.reports.insert(batch.report.id, batch.report.clone());
        state.loos.insert(batch.loo.id, batch.loo.clone());
        Ok(())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreState>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreState>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

fn check_batch(state: &StoreState, batch: &CommitBatch) -> StoreResult<()> {
    let CommitBatch {
        report,
        loo,
        expected_head,
    } = batch;

    if report.loo != loo.id {
        return Err(StoreError::integrity(
            loo.id,
            format!("report {} references loo {}", report.id, report.loo),
        ));
    }

    if state.reports.contains_key(&report.id) {
        return Err(StoreError::DuplicateReport(report.id));
    }

    let current = state.loos.get(&loo.id);
    let head_matches = match (current, expected_head) {
        (None, None) => true,
        (Some(stored), Some(expected)) => stored.latest_report() == Some(*expected),
        _ => false,
    };
    if !head_matches {
        return Err(StoreError::Conflict {
            loo: loo.id,
            expected: describe_head(*expected_head, expected_head.is_some()),
            found: describe_head(current.and_then(Loo::latest_report), current.is_some()),
        });
    }

    if report.previous != *expected_head {
        return Err(StoreError::integrity(
            loo.id,
            "report.previous does not match the loo's latest report",
        ));
    }

    let mut expected_reports = current.map(|l| l.reports.clone()).unwrap_or_default();
    expected_reports.push(report.id);
    if loo.reports != expected_reports {
        return Err(StoreError::integrity(
            loo.id,
            "loo.reports must be the stored history plus the new report",
        ));
    }

    if let Some(previous) = report.previous.and_then(|id| state.reports.get(&id)) {
        if report.created_at <= previous.created_at {
            return Err(StoreError::integrity(
                loo.id,
                format!("report {} is not newer than its previous report", report.id),
            ));
        }
    }

    if loo.updated_at != report.created_at {
        return Err(StoreError::integrity(
            loo.id,
            "loo.updatedAt must equal the new report's createdAt",
        ));
    }

    if loo.properties.geometry.is_none() || loo.properties.active.is_none() {
        return Err(StoreError::integrity(
            loo.id,
            "loo must carry geometry and an active flag",
        ));
    }

    if let Some(stored) = current {
        if stored.created_at != loo.created_at {
            return Err(StoreError::integrity(loo.id, "loo.createdAt is immutable"));
        }
    }

    Ok(())
}

fn describe_head(head: Option<ReportId>, loo_exists: bool) -> String {
    match head {
        Some(id) => id.to_string(),
        None if loo_exists => "loo without history".into(),
        None => "no loo".into(),
    }
}

impl LooWriter for InMemoryLooStore {
    fn commit(&self, batch: &CommitBatch) -> StoreResult<()> {
        self.commit_with(batch, |_| Ok(()))
    }
}

impl LooReader for InMemoryLooStore {
    fn loo(&self, id: &LooId) -> StoreResult<Option<Loo>> {
        Ok(self.read()?.loos.get(id).cloned())
    }

    fn report(&self, id: &ReportId) -> StoreResult<Option<Report>> {
        Ok(self.read()?.reports.get(id).cloned())
    }

    fn loos(&self) -> StoreResult<Vec<Loo>> {
        let mut loos: Vec<Loo> = self.read()?.loos.values().cloned().collect();
        loos.sort_by_key(|loo| loo.id);
        Ok(loos)
    }

    fn reports(&self) -> StoreResult<Vec<Report>> {
        let mut reports: Vec<Report> = self.read()?.reports.values().cloned().collect();
        reports.sort_by_key(|report| (report.created_at, report.id));
        Ok(reports)
    }

    fn loo_reports(&self, id: &LooId) -> StoreResult<Vec<Report>> {
        let state = self.read()?;
        let Some(loo) = state.loos.get(id) else {
            return Ok(vec![]);
        };
        Ok(loo
            .reports
            .iter()
            .filter_map(|report_id| state.reports.get(report_id).cloned())
            .collect())
    }

    fn loo_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.loos.len() as u64)
    }

    fn report_count(&self) -> StoreResult<u64> {
        Ok(self.read()?.reports.len() as u64)
    }
}
