use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use loo_stats::{AreaCounter, Counters, Proportions, ScopeParams};
use loo_types::{Loo, LooId, RemovalInput, Report, ReportId, ReportInput, SCHEMA_VERSION};

use crate::auth::{AuthProvider, Credentials, Identity};
use crate::error::{ServerError, ServerResult};
use crate::facade::{LooFilters, LooPage, NearbyLoo, QueryFacade, SubmissionResponse};

const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub facade: Arc<QueryFacade>,
    pub auth: Arc<dyn AuthProvider>,
    pub read_only: bool,
}

impl AppState {
    async fn identify(&self, headers: &HeaderMap) -> ServerResult<Identity> {
        let credentials = Credentials::from_headers(headers)?;
        self.auth.authenticate(&credentials).await
    }

    /// Run a façade call that may block on disk.
    async fn blocking<T, F>(&self, f: F) -> ServerResult<T>
    where
        F: FnOnce(&QueryFacade) -> T + Send + 'static,
        T: Send + 'static,
    {
        let facade = Arc::clone(&self.facade);
        tokio::task::spawn_blocking(move || f(&facade))
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check handler.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
    })
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "name": "toiletmap",
        "version": env!("CARGO_PKG_VERSION"),
        "schema_version": SCHEMA_VERSION,
        "read_only": state.read_only,
    }))
}

// ---- Loos and reports ----

#[derive(Clone, Debug, Default, Deserialize)]
pub struct LooQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub active: Option<bool>,
    pub fee: Option<bool>,
}

pub async fn list_loos(
    State(state): State<AppState>,
    Query(query): Query<LooQuery>,
) -> ServerResult<Json<LooPage>> {
    let filters = LooFilters {
        active: query.active,
        fee: query.fee,
    };
    let page = state.facade.loos(
        filters,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
    )?;
    Ok(Json(page))
}

#[derive(Clone, Debug, Deserialize)]
pub struct NearQuery {
    pub lng: f64,
    pub lat: f64,
    /// Metres.
    pub radius: Option<f64>,
}

pub async fn loos_near(
    State(state): State<AppState>,
    Query(query): Query<NearQuery>,
) -> ServerResult<Json<Vec<NearbyLoo>>> {
    let nearby = state
        .facade
        .loos_by_proximity(query.lng, query.lat, query.radius)?;
    Ok(Json(nearby))
}

pub async fn get_loo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Loo>> {
    Ok(Json(state.facade.loo(&parse_id::<LooId>(&id)?)?))
}

pub async fn get_loo_reports(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Vec<Report>>> {
    Ok(Json(state.facade.loo_reports(&parse_id::<LooId>(&id)?)?))
}

pub async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ServerResult<Json<Report>> {
    Ok(Json(state.facade.report(&parse_id::<ReportId>(&id)?)?))
}

fn parse_id<T>(raw: &str) -> ServerResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: T::Err| ServerError::BadRequest(e.to_string()))
}

// ---- Submissions ----

pub async fn submit_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ReportInput>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<SubmissionResponse>)> {
    let identity = state.identify(&headers).await?;
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(malformed(rejection)),
    };
    let response = state
        .blocking(move |facade| facade.submit_report(input, &identity))
        .await?;
    Ok(submission(response))
}

pub async fn submit_removal(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RemovalInput>, JsonRejection>,
) -> ServerResult<(StatusCode, Json<SubmissionResponse>)> {
    let identity = state.identify(&headers).await?;
    let Json(input) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return Ok(malformed(rejection)),
    };
    let response = state
        .blocking(move |facade| facade.submit_removal_report(input, &identity))
        .await?;
    Ok(submission(response))
}

/// Undecodable bodies are validation failures and get the same envelope.
fn malformed(rejection: JsonRejection) -> (StatusCode, Json<SubmissionResponse>) {
    submission(SubmissionResponse::failure(rejection.body_text()))
}

fn submission(response: SubmissionResponse) -> (StatusCode, Json<SubmissionResponse>) {
    let status = if response.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    (status, Json(response))
}

// ---- Statistics ----

pub async fn stats_counters(State(state): State<AppState>) -> ServerResult<Json<Counters>> {
    Ok(Json(state.facade.counters()?))
}

pub async fn stats_proportions(State(state): State<AppState>) -> ServerResult<Json<Proportions>> {
    Ok(Json(state.facade.proportions()?))
}

pub async fn stats_areas(
    State(state): State<AppState>,
    Query(params): Query<ScopeParams>,
) -> ServerResult<Json<Vec<AreaCounter>>> {
    Ok(Json(state.facade.area_stats(&params)?))
}

pub async fn stats_contributors(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<ScopeParams>,
) -> ServerResult<Json<BTreeMap<String, u64>>> {
    let identity = state.identify(&headers).await?;
    Ok(Json(state.facade.contributor_counts(&params, &identity)?))
}
