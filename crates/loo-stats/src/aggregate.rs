//! Pure aggregations over a snapshot of loos and reports.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use loo_types::{AccessPermission, Loo, LooId, Report};

use crate::scope::{StatsScope, UNKNOWN_AREA};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counters {
    pub total_loos: u64,
    pub active_loos: u64,
    pub inactive_loos: u64,
    pub total_reports: u64,
    pub removal_reports: u64,
    /// Loos with more than one report.
    pub multiple_reports: u64,
    /// Distinct named contributors.
    pub contributors: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProportionCounters {
    pub public_loos: u64,
    pub unknown_access_loos: u64,
    pub baby_change: u64,
    pub baby_change_unknown: u64,
    pub inaccessible_loos: u64,
    pub accessible_loos_unknown: u64,
    pub active_loos: u64,
    pub total_loos: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proportion {
    pub name: String,
    pub value: u64,
}

fn proportion(name: &str, value: u64) -> Proportion {
    Proportion {
        name: name.to_string(),
        value,
    }
}

/// Four families of buckets; each family sums to the total loo count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proportions {
    pub active_loos: Vec<Proportion>,
    pub public_loos: Vec<Proportion>,
    pub baby_changing: Vec<Proportion>,
    pub accessible_loos: Vec<Proportion>,
}

impl From<&ProportionCounters> for Proportions {
    fn from(c: &ProportionCounters) -> Self {
        let total = c.total_loos;
        Self {
            active_loos: vec![
                proportion("active", c.active_loos),
                proportion("inactive", total.saturating_sub(c.active_loos)),
                proportion("unknown", 0),
            ],
            public_loos: vec![
                proportion("public", c.public_loos),
                proportion(
                    "restricted",
                    total.saturating_sub(c.public_loos + c.unknown_access_loos),
                ),
                proportion("unknown", c.unknown_access_loos),
            ],
            baby_changing: vec![
                proportion("yes", c.baby_change),
                proportion(
                    "no",
                    total.saturating_sub(c.baby_change + c.baby_change_unknown),
                ),
                proportion("unknown", c.baby_change_unknown),
            ],
            accessible_loos: vec![
                proportion(
                    "accessible",
                    total.saturating_sub(c.inaccessible_loos + c.accessible_loos_unknown),
                ),
                proportion("inaccessible", c.inaccessible_loos),
                proportion("unknown", c.accessible_loos_unknown),
            ],
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCounter {
    pub area_name: String,
    pub loo_count: u64,
    pub active_loo_count: u64,
    pub public_loo_count: u64,
    pub permissive_loo_count: u64,
    /// Active loos with baby change.
    pub baby_change_count: u64,
}

pub fn counters(loos: &[Loo], reports: &[Report]) -> Counters {
    let total_loos = loos.len() as u64;
    let active_loos = loos.iter().filter(|l| l.is_active()).count() as u64;
    let contributors: BTreeSet<&str> = reports
        .iter()
        .filter_map(|r| r.contributor.as_deref())
        .collect();

    Counters {
        total_loos,
        active_loos,
        inactive_loos: total_loos - active_loos,
        total_reports: reports.len() as u64,
        removal_reports: reports.iter().filter(|r| r.is_removal()).count() as u64,
        multiple_reports: loos.iter().filter(|l| l.reports.len() > 1).count() as u64,
        contributors: contributors.len() as u64,
    }
}

pub fn proportion_counters(loos: &[Loo]) -> ProportionCounters {
    let mut c = ProportionCounters {
        total_loos: loos.len() as u64,
        ..Default::default()
    };
    for loo in loos {
        let p = &loo.properties;
        match p.access {
            Some(AccessPermission::Public) => c.public_loos += 1,
            None => c.unknown_access_loos += 1,
            Some(_) => {}
        }
        match p.baby_change {
            Some(true) => c.baby_change += 1,
            None => c.baby_change_unknown += 1,
            Some(false) => {}
        }
        match p.accessible {
            Some(false) => c.inaccessible_loos += 1,
            None => c.accessible_loos_unknown += 1,
            Some(true) => {}
        }
        if loo.is_active() {
            c.active_loos += 1;
        }
    }
    c
}

/// Per-area counts, sorted by area name. A loo counts once in every area it
/// lists; loos without areas are not counted.
pub fn areas_counters(loos: &[Loo], scope: &StatsScope) -> Vec<AreaCounter> {
    let mut by_name: BTreeMap<String, AreaCounter> = BTreeMap::new();

    for loo in loos
        .iter()
        .filter(|l| scope.contains(l.created_at) && scope.matches_loo(l))
    {
        let p = &loo.properties;
        let active = loo.is_active();
        for area in p.area.iter().flatten() {
            let name = area.name.as_deref().unwrap_or(UNKNOWN_AREA);
            let counter = by_name
                .entry(name.to_string())
                .or_insert_with(|| AreaCounter {
                    area_name: name.to_string(),
                    ..Default::default()
                });
            counter.loo_count += 1;
            counter.active_loo_count += u64::from(active);
            counter.public_loo_count += u64::from(p.access == Some(AccessPermission::Public));
            counter.permissive_loo_count +=
                u64::from(p.access == Some(AccessPermission::Permissive));
            counter.baby_change_count += u64::from(active && p.baby_change == Some(true));
        }
    }

    by_name.into_values().collect()
}

/// Reports per named contributor, scoped by report time and by the state
/// of the report's loo.
pub fn contributor_counts(
    loos: &[Loo],
    reports: &[Report],
    scope: &StatsScope,
) -> BTreeMap<String, u64> {
    let loos: HashMap<LooId, &Loo> = loos.iter().map(|l| (l.id, l)).collect();
    let mut counts = BTreeMap::new();

    for report in reports.iter().filter(|r| scope.contains(r.created_at)) {
        let Some(name) = report.contributor.as_deref() else {
            continue;
        };
        let in_scope = loos
            .get(&report.loo)
            .is_some_and(|loo| scope.matches_loo(loo));
        if in_scope {
            *counts.entry(name.to_string()).or_insert(0) += 1;
        }
    }

    counts
}
