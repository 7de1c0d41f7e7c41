use std::collections::HashSet;

use loo_types::{LooId, ReportId};

use crate::error::StoreResult;
use crate::replay::ReplayEngine;
use crate::traits::LooReader;

/// Result of validating one loo's history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryReport {
    pub loo: LooId,
    pub report_count: u64,
    pub violations: Vec<Violation>,
}

impl HistoryReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation found in stored history.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    pub report: Option<ReportId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    MissingReport,
    WrongLoo,
    BrokenPreviousLink,
    NonMonotonicTimestamp,
    StaleUpdatedAt,
    ProjectionMismatch,
    InactiveWithoutRemoval,
    OrphanReport,
}

/// Offline checker for the history invariants.
pub struct HistoryValidator;

impl HistoryValidator {
    /// Validate one loo: every listed report exists and points back at the
    /// loo, `previous` links follow list order, timestamps strictly
    /// increase, and the projection equals the replayed diffs.
    pub fn validate_loo<R: LooReader + ?Sized>(reader: &R, id: &LooId) -> StoreResult<HistoryReport> {
        let mut violations = Vec::new();
        let Some(loo) = reader.loo(id)? else {
            return Ok(HistoryReport {
                loo: *id,
                report_count: 0,
                violations,
            });
        };

        let mut expected_previous = None;
        let mut last_created = None;
        let mut saw_removal = false;

        for report_id in &loo.reports {
            let Some(report) = reader.report(report_id)? else {
                violations.push(Violation {
                    report: Some(*report_id),
                    kind: ViolationKind::MissingReport,
                    description: "loo lists a report that is not stored".into(),
                });
                expected_previous = Some(*report_id);
                continue;
            };

            if report.loo != loo.id {
                violations.push(Violation {
                    report: Some(report.id),
                    kind: ViolationKind::WrongLoo,
                    description: format!("report points at loo {}", report.loo),
                });
            }

            if report.previous != expected_previous {
                violations.push(Violation {
                    report: Some(report.id),
                    kind: ViolationKind::BrokenPreviousLink,
                    description: "previous does not name the preceding report".into(),
                });
            }

            if let Some(last) = last_created {
                if report.created_at <= last {
                    violations.push(Violation {
                        report: Some(report.id),
                        kind: ViolationKind::NonMonotonicTimestamp,
                        description: "report is not newer than its previous report".into(),
                    });
                }
            }

            saw_removal |= report.is_removal();
            expected_previous = Some(report.id);
            last_created = Some(report.created_at);
        }

        if let Some(last) = last_created {
            if loo.updated_at != last {
                violations.push(Violation {
                    report: loo.latest_report(),
                    kind: ViolationKind::StaleUpdatedAt,
                    description: "updatedAt differs from the latest report's createdAt".into(),
                });
            }
        }

        if !loo.is_active() && !saw_removal {
            violations.push(Violation {
                report: None,
                kind: ViolationKind::InactiveWithoutRemoval,
                description: "loo is inactive but has no removal report".into(),
            });
        }

        if !ReplayEngine::verify_projection(reader, id)? {
            violations.push(Violation {
                report: None,
                kind: ViolationKind::ProjectionMismatch,
                description: "stored properties differ from replayed diffs".into(),
            });
        }

        Ok(HistoryReport {
            loo: *id,
            report_count: loo.reports.len() as u64,
            violations,
        })
    }

    /// Validate every loo and flag reports that no loo links to.
    pub fn validate_all<R: LooReader + ?Sized>(reader: &R) -> StoreResult<Vec<HistoryReport>> {
        let loos = reader.loos()?;
        let mut linked = HashSet::new();
        let mut reports = Vec::with_capacity(loos.len());

        for loo in &loos {
            linked.extend(loo.reports.iter().copied());
            reports.push(Self::validate_loo(reader, &loo.id)?);
        }

        for report in reader.reports()? {
            if linked.contains(&report.id) {
                continue;
            }
            let violation = Violation {
                report: Some(report.id),
                kind: ViolationKind::OrphanReport,
                description: "report is not linked from any loo".into(),
            };
            match reports.iter_mut().find(|r| r.loo == report.loo) {
                Some(entry) => entry.violations.push(violation),
                None => reports.push(HistoryReport {
                    loo: report.loo,
                    report_count: 0,
                    violations: vec![violation],
                }),
            }
        }

        Ok(reports)
    }
}
