use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loo_types::{parse_timestamp, Loo};

use crate::error::{StatsError, StatsResult};

/// Bucket name for areas recorded without a name.
pub const UNKNOWN_AREA: &str = "Unknown Area";

/// Filter value meaning "no area filter".
const ALL: &str = "All";

/// 2009-01-01T00:00:00Z, the start of recorded history.
const DEFAULT_START_SECS: i64 = 1_230_768_000;

fn default_start() -> DateTime<Utc> {
    DateTime::from_timestamp(DEFAULT_START_SECS, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Resolved filter for scoped statistics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatsScope {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub area: Option<String>,
    pub area_type: Option<String>,
    pub include_inactive: bool,
}

impl StatsScope {
    /// Everything from the start of recorded history until now.
    pub fn all_time(include_inactive: bool) -> Self {
        Self {
            start: default_start(),
            end: Utc::now(),
            area: None,
            area_type: None,
            include_inactive,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// Activity and area filters. Time is checked separately because loos
    /// and reports are scoped on different timestamps.
    pub fn matches_loo(&self, loo: &Loo) -> bool {
        if !self.include_inactive && !loo.is_active() {
            return false;
        }
        let areas = loo.properties.area.as_deref().unwrap_or_default();
        if let Some(name) = &self.area {
            if !areas.iter().any(|a| a.name.as_deref() == Some(name.as_str())) {
                return false;
            }
        }
        if let Some(area_type) = &self.area_type {
            if !areas
                .iter()
                .any(|a| a.area_type.as_deref() == Some(area_type.as_str()))
            {
                return false;
            }
        }
        true
    }
}

/// Unparsed scope as it arrives in a query string.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub area: Option<String>,
    pub area_type: Option<String>,
    pub include_inactive: Option<bool>,
}

impl ScopeParams {
    /// Parse dates and apply defaults. `"All"` or a blank value disables an
    /// area filter.
    pub fn resolve(&self, default_include_inactive: bool) -> StatsResult<StatsScope> {
        let start = match self.start.as_deref() {
            Some(s) => parse_bound(s)?,
            None => default_start(),
        };
        let end = match self.end.as_deref() {
            Some(s) => parse_bound(s)?,
            None => Utc::now(),
        };
        if start > end {
            return Err(StatsError::InvalidScope(format!(
                "start {start} is after end {end}"
            )));
        }

        Ok(StatsScope {
            start,
            end,
            area: area_filter(self.area.as_deref()),
            area_type: area_filter(self.area_type.as_deref()),
            include_inactive: self.include_inactive.unwrap_or(default_include_inactive),
        })
    }
}

fn parse_bound(value: &str) -> StatsResult<DateTime<Utc>> {
    parse_timestamp(value).map_err(|e| StatsError::InvalidScope(e.to_string()))
}

fn area_filter(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL)
        .map(str::to_string)
}
