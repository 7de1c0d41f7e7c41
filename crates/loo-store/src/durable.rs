use std::path::Path;

use tracing::{info, warn};

use loo_types::{Loo, LooId, Report, ReportId};

use crate::error::StoreResult;
use crate::memory::InMemoryLooStore;
use crate::traits::{CommitBatch, LooReader, LooWriter};
use crate::wal::{WalConfig, WriteAheadLog};

/// File name of the WAL segment inside a data directory.
pub const WAL_FILE: &str = "loos.wal";

/// Store that keeps the working set in memory and logs every committed
/// batch to a write-ahead log before applying it.
///
/// Lifecycle: [`open`](Self::open) replays the log, [`close`](Self::close)
/// flushes and syncs it.
pub struct DurableLooStore {
    memory: InMemoryLooStore,
    wal: WriteAheadLog,
}

impl DurableLooStore {
    /// Open the store under `dir`, recovering every intact batch.
    pub fn open(dir: &Path, config: WalConfig) -> StoreResult<Self> {
        let wal = WriteAheadLog::open(&dir.join(WAL_FILE), config)?;
        let recovery = wal.recover()?;
        let memory = InMemoryLooStore::new();

        let mut applied = 0usize;
        for batch in &recovery.batches {
            match memory.commit(batch) {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    loo = %batch.loo.id,
                    report = %batch.report.id,
                    error = %e,
                    "skipping WAL batch that no longer applies"
                ),
            }
        }
        wal.truncate_to(recovery.valid_len)?;

        info!(path = %wal.path().display(), applied, "durable loo store opened");
        Ok(Self { memory, wal })
    }

    /// Sync the log without giving up the store. Safe while other handles
    /// are still committing.
    pub fn sync(&self) -> StoreResult<()> {
        self.wal.sync()
    }

    /// Flush and sync the log.
    pub fn close(self) -> StoreResult<()> {
        self.wal.sync()?;
        info!(path = %self.wal.path().display(), "durable loo store closed");
        Ok(())
    }
}

impl LooWriter for DurableLooStore {
    fn commit(&self, batch: &CommitBatch) -> StoreResult<()> {
        self.memory
            .commit_with(batch, |b| self.wal.append(b).map(|_| ()))
    }
}

impl LooReader for DurableLooStore {
    fn loo(&self, id: &LooId) -> StoreResult<Option<Loo>> {
        self.memory.loo(id)
    }

    fn report(&self, id: &ReportId) -> StoreResult<Option<Report>> {
        self.memory.report(id)
    }

    fn loos(&self) -> StoreResult<Vec<Loo>> {
        self.memory.loos()
    }

    fn reports(&self) -> StoreResult<Vec<Report>> {
        self.memory.reports()
    }

    fn loo_reports(&self, id: &LooId) -> StoreResult<Vec<Report>> {
        self.memory.loo_reports(id)
    }

    fn loo_count(&self) -> StoreResult<u64> {
        self.memory.loo_count()
    }

    fn report_count(&self) -> StoreResult<u64> {
        self.memory.report_count()
    }
}

#[cfg(test)]
mod tests {
    use std::fs::OpenOptions;
    use std::io::Write;

    use super::*;
    use crate::error::StoreError;
    use crate::testing::{edit_batch, new_loo_batch, FailingSegment};
    use loo_types::LooProperties;

    #[test]
    fn committed_batches_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = new_loo_batch("Station Loo", 51.5, -0.1);
        let second = edit_batch(
            &first.loo,
            LooProperties {
                notes: Some("Closed for repair".into()),
                ..Default::default()
            },
        );

        let store = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        store.commit(&first).unwrap();
        store.commit(&second).unwrap();
        store.close().unwrap();

        let reopened = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        let loo = reopened.loo(&first.loo.id).unwrap().unwrap();
        assert_eq!(loo, second.loo);
        assert_eq!(reopened.report_count().unwrap(), 2);
    }

    #[test]
    fn rejected_batch_is_not_logged() {
        let dir = tempfile::tempdir().unwrap();
        let first = new_loo_batch("Market", 52.63, 1.29);
        let store = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        store.commit(&first).unwrap();
        let offset = store.wal.offset().unwrap();

        let edit = edit_batch(&first.loo, LooProperties::default());
        store.commit(&edit).unwrap();
        let conflicting = edit_batch(&first.loo, LooProperties::default());
        assert!(matches!(
            store.commit(&conflicting).unwrap_err(),
            StoreError::Conflict { .. }
        ));

        let after = store.wal.offset().unwrap();
        assert!(after > offset);
        let recovered = store.wal.recover().unwrap();
        assert_eq!(recovered.batches.len(), 2);
    }

    #[test]
    fn torn_tail_leaves_no_orphan_report() {
        let dir = tempfile::tempdir().unwrap();
        let first = new_loo_batch("Pier", 50.8, -1.1);
        {
            let store = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
            store.commit(&first).unwrap();
            store.close().unwrap();
        }

        // A second batch whose write was cut short.
        let torn = edit_batch(&first.loo, LooProperties::default());
        let payload = serde_json::to_vec(&torn).unwrap();
        let mut file = OpenOptions::new()
            .append(true)
            .open(dir.path().join(WAL_FILE))
            .unwrap();
        file.write_all(&(payload.len() as u32).to_le_bytes()).unwrap();
        file.write_all(&crc32fast::hash(&payload).to_le_bytes()).unwrap();
        file.write_all(&payload[..payload.len() / 2]).unwrap();
        drop(file);

        let store = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        assert!(store.report(&torn.report.id).unwrap().is_none());
        assert_eq!(store.loo(&first.loo.id).unwrap().unwrap(), first.loo);

        // The log accepts new commits after the torn tail was cut.
        let next = edit_batch(&first.loo, LooProperties::default());
        store.commit(&next).unwrap();
        store.close().unwrap();
        let reopened = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        assert_eq!(reopened.report_count().unwrap(), 2);
    }

    #[test]
    fn failed_append_does_not_swallow_later_commits() {
        let dir = tempfile::tempdir().unwrap();
        let first = new_loo_batch("Bus Station", 52.2, 0.12);
        let store = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        store.commit(&first).unwrap();

        let (segment, budget) = FailingSegment::open(&dir.path().join(WAL_FILE), 100);
        store.wal.replace_segment(Box::new(segment));
        let large = edit_batch(
            &first.loo,
            LooProperties {
                notes: Some("x".repeat(20_000)),
                ..Default::default()
            },
        );
        assert!(matches!(store.commit(&large), Err(StoreError::Io(_))));
        assert!(store.report(&large.report.id).unwrap().is_none());

        budget.store(u64::MAX, std::sync::atomic::Ordering::SeqCst);
        let small = edit_batch(
            &first.loo,
            LooProperties {
                notes: Some("Open late".into()),
                ..Default::default()
            },
        );
        store.commit(&small).unwrap();
        store.close().unwrap();

        let reopened = DurableLooStore::open(dir.path(), WalConfig::default()).unwrap();
        assert!(reopened.report(&large.report.id).unwrap().is_none());
        assert!(reopened.report(&small.report.id).unwrap().is_some());
        assert_eq!(reopened.report_count().unwrap(), 2);
        assert_eq!(reopened.loo(&first.loo.id).unwrap().unwrap(), small.loo);
    }
}
