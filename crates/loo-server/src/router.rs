use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handler::{self, AppState};

/// Build the axum router with all Toilet Map endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/health", get(handler::health_handler))
        .route("/v1/info", get(handler::info_handler))
        .route("/v1/loos", get(handler::list_loos))
        .route("/v1/loos/near", get(handler::loos_near))
        .route("/v1/loos/:id", get(handler::get_loo))
        .route("/v1/loos/:id/reports", get(handler::get_loo_reports))
        .route("/v1/reports", post(handler::submit_report))
        .route("/v1/reports/removal", post(handler::submit_removal))
        .route("/v1/reports/:id", get(handler::get_report))
        .route("/v1/stats/counters", get(handler::stats_counters))
        .route("/v1/stats/proportions", get(handler::stats_proportions))
        .route("/v1/stats/areas", get(handler::stats_areas))
        .route("/v1/stats/contributors", get(handler::stats_contributors))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
