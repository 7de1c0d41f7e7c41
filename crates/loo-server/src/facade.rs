//! Query façade: the operations the HTTP layer exposes, expressed over the
//! reconciler, the stats service, and a shared store handle.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use loo_reconciler::{ReconcileError, Reconciler};
use loo_stats::{AreaCounter, Counters, Proportions, ScopeParams, StatsError, StatsService};
use loo_store::{LooStore, StoreError};
use loo_types::{Location, Loo, LooId, RemovalInput, Report, ReportId, ReportInput};

use crate::auth::Identity;
use crate::config::ServerConfig;

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0}")]
    Persistence(String),
}

impl FacadeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<ReconcileError> for FacadeError {
    fn from(e: ReconcileError) -> Self {
        let message = e.to_string();
        match e {
            ReconcileError::Validation(_) => Self::Validation(message),
            ReconcileError::NotFound(_) => Self::NotFound(message),
            ReconcileError::Authorization(_) => Self::Authorization(message),
            ReconcileError::Persistence(_) => Self::Persistence(message),
        }
    }
}

impl From<StatsError> for FacadeError {
    fn from(e: StatsError) -> Self {
        match e {
            StatsError::InvalidScope(_) => Self::Validation(e.to_string()),
            StatsError::Store(_) => Self::Persistence(e.to_string()),
        }
    }
}

impl From<StoreError> for FacadeError {
    fn from(e: StoreError) -> Self {
        Self::Persistence(e.to_string())
    }
}

pub type FacadeResult<T> = Result<T, FacadeError>;

/// Outcome of a submission, successful or not.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub success: bool,
    /// `"200"` on success, `"400"` otherwise.
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loo: Option<Loo>,
}

impl SubmissionResponse {
    fn from_result(result: Result<(Report, Loo), ReconcileError>) -> Self {
        match result {
            Ok((report, loo)) => Self {
                success: true,
                code: "200".into(),
                message: "Report processed".into(),
                report: Some(report),
                loo: Some(loo),
            },
            Err(e) => Self::failure(e.to_string()),
        }
    }

    /// A handled failure: `code` 400 and no records.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: "400".into(),
            message: message.into(),
            report: None,
            loo: None,
        }
    }
}

/// Filters for paged listing. `fee: Some(true)` keeps loos that charge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooFilters {
    pub active: Option<bool>,
    pub fee: Option<bool>,
}

impl LooFilters {
    fn matches(&self, loo: &Loo) -> bool {
        self.active.map_or(true, |a| loo.is_active() == a)
            && self.fee.map_or(true, |f| loo.properties.fee.is_some() == f)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LooPage {
    pub loos: Vec<Loo>,
    pub total: u64,
    pub pages: u64,
    pub limit: u32,
    pub page: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NearbyLoo {
    #[serde(flatten)]
    pub loo: Loo,
    /// Metres from the query point.
    pub distance: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FacadeConfig {
    pub max_page_limit: u32,
    pub max_proximity_radius_m: f64,
    pub default_proximity_radius_m: f64,
}

impl From<&ServerConfig> for FacadeConfig {
    fn from(c: &ServerConfig) -> Self {
        Self {
            max_page_limit: c.max_page_limit,
            max_proximity_radius_m: c.max_proximity_radius_m,
            default_proximity_radius_m: c.default_proximity_radius_m,
        }
    }
}

pub struct QueryFacade {
    store: Arc<dyn LooStore>,
    reconciler: Reconciler<dyn LooStore>,
    stats: StatsService<dyn LooStore>,
    config: FacadeConfig,
}

impl QueryFacade {
    pub fn new(store: Arc<dyn LooStore>, server: &ServerConfig) -> Self {
        Self {
            reconciler: Reconciler::with_config(Arc::clone(&store), server.gate_config()),
            stats: StatsService::new(Arc::clone(&store), server.stats.clone()),
            config: FacadeConfig::from(server),
            store,
        }
    }

    // ---- Submissions ----

    pub fn submit_report(&self, input: ReportInput, identity: &Identity) -> SubmissionResponse {
        let contributor = identity.contributor();
        SubmissionResponse::from_result(self.reconciler.submit_report(
            input,
            contributor.as_ref(),
            None,
        ))
    }

    pub fn submit_removal_report(
        &self,
        input: RemovalInput,
        identity: &Identity,
    ) -> SubmissionResponse {
        let contributor = identity.contributor();
        SubmissionResponse::from_result(
            self.reconciler.submit_removal(input, contributor.as_ref()),
        )
    }

    // ---- Lookups ----

    pub fn loo(&self, id: &LooId) -> FacadeResult<Loo> {
        self.store
            .loo(id)?
            .ok_or_else(|| FacadeError::NotFound(format!("loo not found: {id}")))
    }

    pub fn report(&self, id: &ReportId) -> FacadeResult<Report> {
        self.store
            .report(id)?
            .ok_or_else(|| FacadeError::NotFound(format!("report not found: {id}")))
    }

    /// History of a loo, oldest first.
    pub fn loo_reports(&self, id: &LooId) -> FacadeResult<Vec<Report>> {
        self.loo(id)?;
        Ok(self.store.loo_reports(id)?)
    }

    /// Filtered loos, most recently updated first.
    pub fn loos(&self, filters: LooFilters, page: u32, limit: u32) -> FacadeResult<LooPage> {
        if page == 0 {
            return Err(FacadeError::Validation("page must be at least 1".into()));
        }
        if limit == 0 || limit > self.config.max_page_limit {
            return Err(FacadeError::Validation(format!(
                "limit must be between 1 and {}",
                self.config.max_page_limit
            )));
        }

        let mut loos: Vec<Loo> = self
            .store
            .loos()?
            .into_iter()
            .filter(|l| filters.matches(l))
            .collect();
        loos.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));

        let total = loos.len() as u64;
        let pages = total.div_ceil(u64::from(limit));
        let skip = (page as usize - 1).saturating_mul(limit as usize);
        let loos = loos.into_iter().skip(skip).take(limit as usize).collect();

        Ok(LooPage {
            loos,
            total,
            pages,
            limit,
            page,
        })
    }

    /// Active loos within `radius_m` of the point, nearest first.
    pub fn loos_by_proximity(
        &self,
        lng: f64,
        lat: f64,
        radius_m: Option<f64>,
    ) -> FacadeResult<Vec<NearbyLoo>> {
        let origin = Location::new(lat, lng);
        origin
            .validate()
            .map_err(|e| FacadeError::Validation(e.to_string()))?;

        let radius = radius_m.unwrap_or(self.config.default_proximity_radius_m);
        if !(radius.is_finite() && radius > 0.0 && radius <= self.config.max_proximity_radius_m) {
            return Err(FacadeError::Validation(format!(
                "radius must be positive and at most {} metres",
                self.config.max_proximity_radius_m
            )));
        }

        let mut nearby: Vec<NearbyLoo> = self
            .store
            .loos()?
            .into_iter()
            .filter(Loo::is_active)
            .filter_map(|loo| {
                let distance = origin.distance_m(&loo.location()?);
                (distance <= radius).then_some(NearbyLoo { loo, distance })
            })
            .collect();
        nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        Ok(nearby)
    }

    // ---- Statistics ----

    pub fn counters(&self) -> FacadeResult<Counters> {
        Ok(self.stats.counters()?)
    }

    pub fn proportions(&self) -> FacadeResult<Proportions> {
        Ok(self.stats.proportions()?)
    }

    /// Per-area counts; inactive loos are included unless the scope says otherwise.
    pub fn area_stats(&self, params: &ScopeParams) -> FacadeResult<Vec<AreaCounter>> {
        let scope = params.resolve(true)?;
        Ok(self.stats.areas_counters(&scope)?)
    }

    /// Reports per contributor. Admin only.
    pub fn contributor_counts(
        &self,
        params: &ScopeParams,
        identity: &Identity,
    ) -> FacadeResult<BTreeMap<String, u64>> {
        if !identity.is_admin {
            return Err(FacadeError::Authorization(
                "contributor statistics require an admin identity".into(),
            ));
        }
        let scope = params.resolve(false)?;
        Ok(self.stats.contributor_counts(&scope)?)
    }
}
