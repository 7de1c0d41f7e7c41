use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use loo_store::{LooReader, StoreResult};
use loo_types::{Loo, Report};

use crate::aggregate::{self, AreaCounter, Counters, ProportionCounters, Proportions};
use crate::error::StatsResult;
use crate::scope::StatsScope;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Attempts per store read before a transient failure is surfaced.
    pub max_read_attempts: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            max_read_attempts: 3,
        }
    }
}

/// Read-only statistics over a loo store.
pub struct StatsService<R: ?Sized> {
    reader: Arc<R>,
    config: StatsConfig,
}

impl<R: LooReader + ?Sized> StatsService<R> {
    pub fn new(reader: Arc<R>, config: StatsConfig) -> Self {
        Self { reader, config }
    }

    pub fn counters(&self) -> StatsResult<Counters> {
        let (loos, reports) = self.snapshot()?;
        Ok(aggregate::counters(&loos, &reports))
    }

    pub fn proportion_counters(&self) -> StatsResult<ProportionCounters> {
        let loos = self.read(|r| r.loos())?;
        Ok(aggregate::proportion_counters(&loos))
    }

    pub fn proportions(&self) -> StatsResult<Proportions> {
        Ok(Proportions::from(&self.proportion_counters()?))
    }

    pub fn areas_counters(&self, scope: &StatsScope) -> StatsResult<Vec<AreaCounter>> {
        let loos = self.read(|r| r.loos())?;
        Ok(aggregate::areas_counters(&loos, scope))
    }

    pub fn contributor_counts(&self, scope: &StatsScope) -> StatsResult<BTreeMap<String, u64>> {
        let (loos, reports) = self.snapshot()?;
        Ok(aggregate::contributor_counts(&loos, &reports, scope))
    }

    fn snapshot(&self) -> StatsResult<(Vec<Loo>, Vec<Report>)> {
        Ok((self.read(|r| r.loos())?, self.read(|r| r.reports())?))
    }

    /// Run `op`, repeating it while it fails with a transient error.
    fn read<T>(&self, op: impl Fn(&R) -> StoreResult<T>) -> StatsResult<T> {
        let attempts = self.config.max_read_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(&*self.reader) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(attempt, max = attempts, error = %e, "store read failed; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::aggregate::fixtures::{loo, snapshot};
    use crate::error::StatsError;
    use crate::scope::ScopeParams;
    use loo_store::StoreError;
    use loo_types::{LooId, ReportId};

    /// Reader over a fixed snapshot whose first `failures` list calls fail.
    struct FlakyReader {
        loos: Vec<Loo>,
        reports: Vec<Report>,
        failures: u32,
        calls: AtomicU32,
    }

    impl FlakyReader {
        fn new(failures: u32) -> Self {
            let (loos, reports) = snapshot(vec![loo(), loo().removed()]);
            Self {
                loos,
                reports,
                failures,
                calls: AtomicU32::new(0),
            }
        }

        fn trip(&self) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(StoreError::Io(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "disk hiccup",
                )));
            }
            Ok(())
        }
    }

    impl LooReader for FlakyReader {
        fn loo(&self, id: &LooId) -> StoreResult<Option<Loo>> {
            Ok(self.loos.iter().find(|l| l.id == *id).cloned())
        }

        fn report(&self, id: &ReportId) -> StoreResult<Option<Report>> {
            Ok(self.reports.iter().find(|r| r.id == *id).cloned())
        }

        fn loos(&self) -> StoreResult<Vec<Loo>> {
            self.trip()?;
            Ok(self.loos.clone())
        }

        fn reports(&self) -> StoreResult<Vec<Report>> {
            Ok(self.reports.clone())
        }
    }

    #[test]
    fn transient_failures_are_retried() {
        let reader = Arc::new(FlakyReader::new(2));
        let service = StatsService::new(Arc::clone(&reader), StatsConfig::default());
        let counters = service.counters().unwrap();
        assert_eq!(counters.total_loos, 2);
        assert_eq!(counters.inactive_loos, 1);
        assert_eq!(reader.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn retries_are_bounded() {
        let reader = Arc::new(FlakyReader::new(10));
        let service = StatsService::new(
            Arc::clone(&reader),
            StatsConfig {
                max_read_attempts: 3,
            },
        );
        let err = service.proportions().unwrap_err();
        assert!(matches!(err, StatsError::Store(StoreError::Io(_))));
        assert_eq!(reader.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn service_serves_every_aggregation() {
        let service = StatsService::new(Arc::new(FlakyReader::new(0)), StatsConfig::default());
        let proportions = service.proportions().unwrap();
        assert_eq!(proportions.active_loos[0].value, 1);

        let scope = ScopeParams::default().resolve(true).unwrap();
        assert!(service.areas_counters(&scope).unwrap().is_empty());

        let counts = service.contributor_counts(&scope).unwrap();
        assert_eq!(counts.get("alice"), Some(&2));
        assert_eq!(counts.get("bob"), Some(&1));
    }

    #[test]
    fn config_defaults_when_missing() {
        let config: StatsConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.max_read_attempts, 3);
    }
}
