//! HTTP API — Axum server for the trading frontend proxy.
//!
//! CORS is open because the frontend dev server runs on its own origin.

pub mod routes;

use anyhow::Result;
use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use routes::AppState;

/// Start the API server. Spawns a background task — it doesn't block.
pub fn spawn_server(state: AppState, port: u16) -> Result<()> {
    let app = build_router(state);

    tokio::spawn(async move {
        let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
        info!(port, "API server starting on http://localhost:{port}");

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .expect("Failed to bind API port");

        axum::serve(listener, app).await.expect("API server error");
    });

    Ok(())
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin("*".parse::<HeaderValue>().unwrap())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/scan", get(routes::scan))
        .route("/auto", post(routes::auto))
        .route("/activity", get(routes::activity))
        .route("/trade", post(routes::trade))
        .route("/router", post(routes::set_router))
        .route("/health", get(routes::health))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainRegistry;
    use crate::config::{ChainSettings, TradingConfig};
    use crate::engine::activity::ActivityLog;
    use crate::engine::scheduler::TradingScheduler;
    use crate::engine::{OpportunitySource, SwapService};
    use crate::error::EngineError;
    use crate::types::{ChainKey, Opportunity, SwapResult};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use super::routes::EngineState;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StubScanner;

    #[async_trait]
    impl OpportunitySource for StubScanner {
        async fn scan(&self, _chain: ChainKey) -> Vec<Opportunity> {
            vec![
                Opportunity::placeholder("0xA", "Token A", "AAA", 3.2),
                Opportunity::placeholder("0xB", "Token B", "BBB", 1.8),
            ]
        }
    }

    struct StubTrader {
        configured: bool,
    }

    #[async_trait]
    impl SwapService for StubTrader {
        async fn swap_native_for_token(
            &self,
            _chain: ChainKey,
            token_out: &str,
            amount_native: &str,
        ) -> Result<SwapResult, EngineError> {
            if token_out == "0xBadToken" {
                return Err(EngineError::InvalidAddress(token_out.into()));
            }
            Ok(SwapResult::DryRun {
                dry_run: true,
                id: "dry-run-test".into(),
                token_in: None,
                token_out: token_out.into(),
                amount_in: amount_native.into(),
                min_out: "950".into(),
                quote_source: "router".into(),
            })
        }

        async fn swap_token_for_token(
            &self,
            _chain: ChainKey,
            token_in: &str,
            token_out: &str,
            amount_in: &str,
        ) -> Result<SwapResult, EngineError> {
            Ok(SwapResult::DryRun {
                dry_run: true,
                id: "dry-run-test".into(),
                token_in: Some(token_in.into()),
                token_out: token_out.into(),
                amount_in: amount_in.into(),
                min_out: "0".into(),
                quote_source: "router".into(),
            })
        }

        fn is_configured(&self) -> bool {
            self.configured
        }
    }

    fn test_state(configured: bool) -> AppState {
        let scanner: Arc<dyn OpportunitySource> = Arc::new(StubScanner);
        let trader: Arc<dyn SwapService> = Arc::new(StubTrader { configured });
        let registry = Arc::new(ChainRegistry::new(ChainSettings::default()));
        let activity = ActivityLog::new();
        let scheduler = TradingScheduler::new(
            Arc::clone(&scanner),
            Arc::clone(&trader),
            Arc::clone(&registry),
            activity.clone(),
            &TradingConfig {
                tick_secs: 3600,
                ..Default::default()
            },
        );
        Arc::new(EngineState {
            scheduler,
            scanner,
            trader,
            registry,
            activity,
        })
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 100_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_endpoint_is_ok() {
        let app = build_router(test_state(true));
        let resp = app.oneshot(get_req("/health")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn scan_returns_opportunities_sorted() {
        let app = build_router(test_state(true));
        let resp = app.oneshot(get_req("/scan?chain=base")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        let list = json["tokens"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["address"], "0xA");
        assert_eq!(list[0]["score"], 3.2);
    }

    #[tokio::test]
    async fn auto_enable_and_disable_round_trip() {
        let state = test_state(true);
        let app = build_router(Arc::clone(&state));

        let resp = app
            .clone()
            .oneshot(post_req("/auto", r#"{"enable": true, "chain": "base"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["autoTrading"], true);
        assert!(state.scheduler.is_enabled().await);

        let resp = app
            .oneshot(post_req("/auto", r#"{"enable": false}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["autoTrading"], false);
        assert!(!state.scheduler.is_enabled().await);
    }

    #[tokio::test]
    async fn auto_enable_without_prerequisites_is_rejected() {
        let state = test_state(false);
        let app = build_router(Arc::clone(&state));

        let resp = app
            .oneshot(post_req("/auto", r#"{"enable": true}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("not configured"));
        assert!(!state.scheduler.is_enabled().await);
    }

    #[tokio::test]
    async fn trade_returns_receipt() {
        let app = build_router(test_state(true));
        let resp = app
            .oneshot(post_req(
                "/trade",
                r#"{"tokenAddress": "0xToken", "amountInEth": "0.01"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["receipt"]["dryRun"], true);
        assert_eq!(json["receipt"]["minOut"], "950");
    }

    #[tokio::test]
    async fn trade_without_required_fields_is_bad_request() {
        let app = build_router(test_state(true));
        let resp = app
            .oneshot(post_req("/trade", r#"{"amountInEth": "0.01"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn trade_failure_carries_error_body() {
        let app = build_router(test_state(true));
        let resp = app
            .oneshot(post_req(
                "/trade",
                r#"{"tokenAddress": "0xBadToken", "amountInEth": "0.01"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert!(json["error"].as_str().unwrap().contains("invalid address"));
    }

    #[tokio::test]
    async fn router_override_applies_to_registry() {
        let state = test_state(true);
        let app = build_router(Arc::clone(&state));

        let resp = app
            .oneshot(post_req(
                "/router",
                r#"{"chain": "bsc", "address": "0x3333333333333333333333333333333333333333"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["ok"], true);

        let cfg = state.registry.resolve(Some("bsc"));
        assert_eq!(
            cfg.router.unwrap().to_string().to_lowercase(),
            "0x3333333333333333333333333333333333333333"
        );
    }

    #[tokio::test]
    async fn router_override_rejects_garbage_address() {
        let app = build_router(test_state(true));
        let resp = app
            .oneshot(post_req("/router", r#"{"address": "not-an-address"}"#))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn activity_starts_empty() {
        let app = build_router(test_state(true));
        let resp = app.oneshot(get_req("/activity")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert!(json["activity"].as_array().unwrap().is_empty());
    }
}
