//! Batch builders and fault injection shared by this crate's tests.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use loo_types::{
    next_timestamp, Location, Loo, LooId, LooProperties, Point, Report, ReportId, SCHEMA_VERSION,
};

use crate::traits::CommitBatch;
use crate::wal::SegmentFile;

pub(crate) fn new_loo_batch(name: &str, lat: f64, lng: f64) -> CommitBatch {
    let created_at = next_timestamp(None);
    let loo_id = LooId::new();
    let diff = LooProperties {
        name: Some(name.into()),
        active: Some(true),
        geometry: Some(Point::from(Location::new(lat, lng))),
        ..Default::default()
    };
    let report = Report {
        id: ReportId::new(),
        schema_version: SCHEMA_VERSION,
        loo: loo_id,
        diff: diff.clone(),
        previous: None,
        contributor: Some("tester".into()),
        created_at,
    };
    let loo = Loo {
        id: loo_id,
        schema_version: SCHEMA_VERSION,
        properties: diff,
        reports: vec![report.id],
        created_at,
        updated_at: created_at,
    };
    CommitBatch {
        report,
        loo,
        expected_head: None,
    }
}

pub(crate) fn edit_batch(current: &Loo, diff: LooProperties) -> CommitBatch {
    let created_at = next_timestamp(Some(current.updated_at));
    let report = Report {
        id: ReportId::new(),
        schema_version: SCHEMA_VERSION,
        loo: current.id,
        diff: diff.clone(),
        previous: current.latest_report(),
        contributor: None,
        created_at,
    };
    let mut loo = current.clone();
    loo.properties.merge(&diff);
    loo.reports.push(report.id);
    loo.updated_at = created_at;
    CommitBatch {
        report,
        loo,
        expected_head: current.latest_report(),
    }
}

/// Segment file that accepts `budget` more bytes and then fails mid-write,
/// the way a full disk or a file size limit does.
pub(crate) struct FailingSegment {
    file: File,
    budget: Arc<AtomicU64>,
    fail_sync: bool,
}

impl FailingSegment {
    /// Open `path` for appending. The returned counter can be raised to
    /// let writes through again.
    pub(crate) fn open(path: &Path, budget: u64) -> (Self, Arc<AtomicU64>) {
        let file = OpenOptions::new().append(true).open(path).unwrap();
        let budget = Arc::new(AtomicU64::new(budget));
        let segment = Self {
            file,
            budget: Arc::clone(&budget),
            fail_sync: false,
        };
        (segment, budget)
    }

    pub(crate) fn failing_sync(self) -> Self {
        Self {
            fail_sync: true,
            ..self
        }
    }
}

impl Write for FailingSegment {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.budget.load(Ordering::SeqCst);
        if remaining == 0 {
            return Err(io::Error::other("segment full"));
        }
        let allowed = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let written = self.file.write(&buf[..allowed])?;
        self.budget.fetch_sub(written as u64, Ordering::SeqCst);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl SegmentFile for FailingSegment {
    fn set_len(&self, len: u64) -> io::Result<()> {
        self.file.set_len(len)
    }

    fn sync_all(&self) -> io::Result<()> {
        if self.fail_sync {
            return Err(io::Error::other("sync failed"));
        }
        self.file.sync_all()
    }
}
