//! HTTP server for the Toilet Map.
//!
//! Exposes loo lookups, paged and proximity queries, report and removal
//! submission, and statistics over a JSON API. Every write goes through
//! the submission gate and the report reconciler.

pub mod auth;
pub mod config;
pub mod error;
pub mod facade;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{AllowAllAuth, AuthProvider, Credentials, Identity, StaticTokenAuth};
pub use config::{ServerConfig, TokenConfig};
pub use error::{ServerError, ServerResult};
pub use facade::{FacadeError, LooFilters, LooPage, NearbyLoo, QueryFacade, SubmissionResponse};
pub use server::{LooServer, StoreHandle};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use loo_store::InMemoryLooStore;
    use loo_types::{LooId, REPORT_PERMISSION};
    use serde_json::{json, Value};
    use tower::util::ServiceExt;

    fn config() -> ServerConfig {
        ServerConfig {
            tokens: vec![
                TokenConfig {
                    token: "alice-token".into(),
                    name: "alice".into(),
                    permissions: vec![REPORT_PERMISSION.into()],
                    admin: false,
                },
                TokenConfig {
                    token: "admin-token".into(),
                    name: "root".into(),
                    permissions: vec![REPORT_PERMISSION.into()],
                    admin: true,
                },
            ],
            ..Default::default()
        }
    }

    fn app_with(config: ServerConfig) -> Router {
        LooServer::new(config).router(Arc::new(InMemoryLooStore::new()))
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn get_as(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_as(uri: &str, token: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_loo(app: &Router, name: &str, lat: f64, lng: f64) -> String {
        let (status, body) = send(
            app,
            post_as(
                "/v1/reports",
                "alice-token",
                json!({ "name": name, "location": { "lat": lat, "lng": lng } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["loo"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = app_with(config());
        let (status, body) = send(&app, get("/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn info_endpoint() {
        let app = app_with(config());
        let (status, body) = send(&app, get("/v1/info")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "toiletmap");
        assert_eq!(body["read_only"], false);
    }

    #[tokio::test]
    async fn submit_then_read_back() {
        let app = app_with(config());
        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports",
                "alice-token",
                json!({
                    "name": "Market Square",
                    "location": { "lat": 51.5, "lng": -0.12 },
                    "babyChange": true,
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["code"], "200");
        assert_eq!(body["message"], "Report processed");
        assert_eq!(body["report"]["contributor"], "alice");
        assert_eq!(
            body["loo"]["properties"]["geometry"]["coordinates"],
            json!([-0.12, 51.5])
        );

        let id = body["loo"]["id"].as_str().unwrap();
        let (status, loo) = send(&app, get(&format!("/v1/loos/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(loo["properties"]["name"], "Market Square");
        assert_eq!(loo["properties"]["active"], true);

        let (status, reports) = send(&app, get(&format!("/v1/loos/{id}/reports"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reports.as_array().unwrap().len(), 1);

        let report_id = reports[0]["id"].as_str().unwrap();
        let (status, report) = send(&app, get(&format!("/v1/reports/{report_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["loo"], id);
    }

    #[tokio::test]
    async fn edit_appends_to_history() {
        let app = app_with(config());
        let id = create_loo(&app, "Library", 51.5, -0.1).await;

        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports",
                "alice-token",
                json!({ "edit": id, "notes": "Key at the desk" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["loo"]["properties"]["notes"], "Key at the desk");
        assert_eq!(body["loo"]["properties"]["name"], "Library");

        let (_, reports) = send(&app, get(&format!("/v1/loos/{id}/reports"))).await;
        assert_eq!(reports.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn invalid_submission_returns_400_envelope() {
        let app = app_with(config());
        let (status, body) = send(
            &app,
            post_as("/v1/reports", "alice-token", json!({ "name": "Nowhere" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "400");
        assert!(body.get("loo").is_none());

        let (_, counters) = send(&app, get("/v1/stats/counters")).await;
        assert_eq!(counters["activeLoos"], 0);
    }

    #[tokio::test]
    async fn malformed_field_returns_400_envelope() {
        let app = app_with(config());
        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports",
                "alice-token",
                json!({
                    "name": "Bogus",
                    "access": "bogus",
                    "location": { "lat": 51.5, "lng": -0.1 },
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "400");
        assert!(body["message"].as_str().unwrap().contains("bogus"));
        assert!(body.get("report").is_none());

        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports/removal",
                "alice-token",
                json!({ "edit": "not-a-uuid", "reason": "Gone" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "400");

        let (_, counters) = send(&app, get("/v1/stats/counters")).await;
        assert_eq!(counters["totalLoos"], 0);
    }

    #[tokio::test]
    async fn removal_deactivates_loo() {
        let app = app_with(config());
        let id = create_loo(&app, "Old Kiosk", 51.5, -0.1).await;

        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports/removal",
                "alice-token",
                json!({ "edit": id, "reason": "Demolished" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["loo"]["properties"]["active"], false);
        assert_eq!(body["loo"]["properties"]["removalReason"], "Demolished");

        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports/removal",
                "alice-token",
                json!({ "edit": id, "reason": "   " }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn proximity_and_paging() {
        let app = app_with(config());
        create_loo(&app, "Near", 51.5, -0.1).await;
        create_loo(&app, "Far", 53.4, -2.2).await;

        let (status, near) = send(&app, get("/v1/loos/near?lng=-0.1&lat=51.5001")).await;
        assert_eq!(status, StatusCode::OK);
        let near = near.as_array().unwrap();
        assert_eq!(near.len(), 1);
        assert_eq!(near[0]["properties"]["name"], "Near");
        assert!(near[0]["distance"].as_f64().unwrap() < 50.0);

        let (status, page) = send(&app, get("/v1/loos?page=1&limit=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], 2);
        assert_eq!(page["pages"], 2);
        assert_eq!(page["loos"].as_array().unwrap().len(), 1);

        let (status, _) = send(&app, get("/v1/loos?page=0")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let app = app_with(config());
        let (status, body) = send(
            &app,
            post_as("/v1/reports", "stolen", json!({ "name": "X" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].as_str().unwrap().contains("unknown token"));
    }

    #[tokio::test]
    async fn contributor_stats_require_admin() {
        let app = app_with(config());
        create_loo(&app, "Park", 51.5, -0.1).await;

        let (status, _) = send(&app, get_as("/v1/stats/contributors", "alice-token")).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(&app, get_as("/v1/stats/contributors", "admin-token")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["alice"], 1);
    }

    #[tokio::test]
    async fn area_stats_reject_inverted_scope() {
        let app = app_with(config());
        let (status, _) = send(
            &app,
            get("/v1/stats/areas?start=2024-01-01T00:00:00Z&end=2020-01-01T00:00:00Z"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, get("/v1/stats/areas")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookup_errors_map_to_status() {
        let app = app_with(config());
        let (status, _) = send(&app, get(&format!("/v1/loos/{}", LooId::new()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, get("/v1/loos/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn read_only_mode_rejects_submissions() {
        let app = app_with(ServerConfig {
            read_only: true,
            ..config()
        });
        let (status, body) = send(
            &app,
            post_as(
                "/v1/reports",
                "alice-token",
                json!({ "name": "Pier", "location": { "lat": 50.8, "lng": -1.1 } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("read-only"));

        let (_, info) = send(&app, get("/v1/info")).await;
        assert_eq!(info["read_only"], true);
    }
}
