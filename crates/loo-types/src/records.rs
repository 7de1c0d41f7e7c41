use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Location;
use crate::ids::{LooId, ReportId};
use crate::properties::{LooProperties, SCHEMA_VERSION};

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Current-state projection of one physical toilet.
///
/// `properties` is the in-order merge of every report diff listed in
/// `reports` (oldest first). `properties.geometry` and `properties.active`
/// are always present once the loo exists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Loo {
    pub id: LooId,
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    pub properties: LooProperties,
    pub reports: Vec<ReportId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loo {
    /// The latest report in this loo's history.
    pub fn latest_report(&self) -> Option<ReportId> {
        self.reports.last().copied()
    }

    pub fn is_active(&self) -> bool {
        self.properties.active.unwrap_or(false)
    }

    pub fn location(&self) -> Option<Location> {
        self.properties.geometry.map(Location::from)
    }

    /// Names of the areas this loo belongs to (blank entries skipped).
    pub fn area_names(&self) -> impl Iterator<Item = &str> {
        self.properties
            .area
            .iter()
            .flatten()
            .filter_map(|area| area.name.as_deref())
    }
}

/// One immutable contribution to a loo's history.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    /// The loo this report modifies.
    pub loo: LooId,
    /// Fields actually submitted (plus computed geometry and active flag).
    pub diff: LooProperties,
    /// Prior report of the same loo, `None` for the first one.
    pub previous: Option<ReportId>,
    pub contributor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Report {
    /// A removal report flips the loo inactive.
    pub fn is_removal(&self) -> bool {
        self.diff.active == Some(false)
    }

    pub fn location(&self) -> Option<Location> {
        self.diff.geometry.map(Location::from)
    }
}
