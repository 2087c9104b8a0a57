//! API route table
//!
//! - /health, /domains, /domains/:domain - status and domain summaries
//! - /domains/:domain/entities[/:id[/history]] - filtered views and detail
//! - adjust, category, resolve, thresholds - operator actions
//! - /export - JSON or CSV snapshot
//! - /clock[/start|/stop|/tick] - simulation clock control
//! - /events - WebSocket stream of tick events

use axum::routing::{get, post, put};
use axum::Router;

use super::handlers::{self, DashboardState};

/// Create all `/api/v1` routes.
pub fn api_routes(state: DashboardState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        // Domains and entities
        .route("/domains", get(handlers::list_domains))
        .route("/domains/:domain", get(handlers::get_domain))
        .route(
            "/domains/:domain/entities",
            get(handlers::list_entities).post(handlers::add_entity),
        )
        .route(
            "/domains/:domain/entities/:id",
            get(handlers::get_entity).delete(handlers::remove_entity),
        )
        .route("/domains/:domain/entities/:id/history", get(handlers::get_history))
        .route("/domains/:domain/activity", get(handlers::get_activity))
        // Operator actions
        .route("/domains/:domain/entities/:id/adjust", post(handlers::adjust_entity))
        .route("/domains/:domain/adjust", post(handlers::adjust_batch))
        .route("/domains/:domain/entities/:id/category", post(handlers::set_category))
        .route(
            "/domains/:domain/entities/:id/alerts/:alert_id/resolve",
            post(handlers::resolve_alert),
        )
        .route("/domains/:domain/thresholds/:rule_id", put(handlers::update_threshold))
        // Export
        .route("/export", get(handlers::export_reports))
        // Clock
        .route("/clock", get(handlers::get_clock))
        .route("/clock/start", post(handlers::start_clock))
        .route("/clock/stop", post(handlers::stop_clock))
        .route("/clock/tick", post(handlers::tick_clock))
        .route("/events", get(handlers::events))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;
    use crate::config::EngineConfig;
    use crate::engine::Dashboard;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn create_test_state() -> DashboardState {
        let mut config = EngineConfig::default();
        config.simulation.seed = Some(7);
        let dashboard = Dashboard::from_config(&config, Utc::now()).unwrap().into_shared();
        let clock = SimulationClock::new(dashboard.clone(), Duration::from_millis(3000));
        DashboardState::new(dashboard, clock)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_api_routes_health() {
        let app = api_routes(create_test_state());
        let response = app.oneshot(get_request("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["status"], "ok");
        assert_eq!(v["data"]["domains"], 5);
        assert_eq!(v["data"]["clock"], "stopped");
    }

    #[tokio::test]
    async fn test_api_routes_domains() {
        let app = api_routes(create_test_state());
        let response = app.oneshot(get_request("/domains")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        let names: Vec<&str> = v["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["wells", "logistics", "refining", "markets", "field"]);
    }

    #[tokio::test]
    async fn test_unknown_domain_is_404() {
        let app = api_routes(create_test_state());
        let response = app.oneshot(get_request("/domains/mining")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let v = body_json(response).await;
        assert_eq!(v["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_entity_list_filters_by_category() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(get_request("/domains/wells/entities?category=shut-in"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        let items = v["data"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "CHARLIE-7");
    }

    #[tokio::test]
    async fn test_entity_list_rejects_bad_order() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(get_request("/domains/wells/entities?sort=oil&order=up"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_adjust_clamps_value() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/domains/wells/entities/1/adjust",
                serde_json::json!({"field": "choke", "value": 80}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["value"], 64.0);
    }

    #[tokio::test]
    async fn test_adjust_unknown_metric_is_404() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(json_request(
                "POST",
                "/domains/wells/entities/1/adjust",
                serde_json::json!({"field": "rpm", "value": 10}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_clock_tick_advances_generation() {
        let state = create_test_state();
        let app = api_routes(state.clone());
        let response = app
            .oneshot(Request::post("/clock/tick").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let v = body_json(response).await;
        assert_eq!(v["data"]["generation"], 1);
        assert_eq!(state.dashboard.read().await.generation(), 1);
    }

    #[tokio::test]
    async fn test_export_csv_has_header() {
        let app = api_routes(create_test_state());
        let response = app
            .oneshot(get_request("/export?format=csv&domain=markets"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/csv; charset=utf-8"
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("domain,id,name,category,"));
        assert_eq!(text.lines().count(), 4);
    }
}
