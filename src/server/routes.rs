//! API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<EngineState>`.
//! Request and response field names are camelCase to match the frontend
//! proxy contract.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::chain::ChainRegistry;
use crate::engine::activity::ActivityLog;
use crate::engine::scheduler::TradingScheduler;
use crate::engine::{OpportunitySource, SwapService};
use crate::error::EngineError;
use crate::types::{ChainKey, StableToken, TradePreferences};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct EngineState {
    pub scheduler: TradingScheduler,
    pub scanner: Arc<dyn OpportunitySource>,
    pub trader: Arc<dyn SwapService>,
    pub registry: Arc<ChainRegistry>,
    pub activity: ActivityLog,
}

pub type AppState = Arc<EngineState>;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ScanQuery {
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoRequest {
    pub enable: bool,
    pub chain: Option<String>,
    pub max_spend_eth: Option<String>,
    pub max_spend_stable: Option<String>,
    pub stable_token: Option<StableToken>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub token_address: Option<String>,
    pub amount_in_eth: Option<String>,
    pub chain: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterRequest {
    pub chain: Option<String>,
    pub address: Option<String>,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Client mistakes map to 400, everything downstream to 500.
fn status_for(err: &EngineError) -> StatusCode {
    match err {
        EngineError::Validation { .. }
        | EngineError::InvalidAddress(_)
        | EngineError::NotConfigured(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_body(err: &EngineError) -> Json<serde_json::Value> {
    Json(json!({ "error": err.to_string() }))
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /scan — one fresh scan, highest score first.
pub async fn scan(
    State(state): State<AppState>,
    Query(query): Query<ScanQuery>,
) -> Json<serde_json::Value> {
    let chain = ChainKey::resolve(query.chain.as_deref());
    let tokens = state.scanner.scan(chain).await;
    Json(json!({ "tokens": tokens }))
}

/// POST /auto — enable or disable the auto-trading loop.
pub async fn auto(
    State(state): State<AppState>,
    Json(req): Json<AutoRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    if !req.enable {
        state.scheduler.disable().await;
        return (StatusCode::OK, Json(json!({ "autoTrading": false })));
    }

    let prefs = TradePreferences {
        chain: ChainKey::resolve(req.chain.as_deref()),
        max_spend_native: req.max_spend_eth,
        max_spend_stable: req.max_spend_stable,
        stable_token: req.stable_token,
    };

    match state.scheduler.enable(prefs).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "autoTrading": true }))),
        Err(e) => (status_for(&e), error_body(&e)),
    }
}

/// GET /activity — retained engine actions, newest first.
pub async fn activity(State(state): State<AppState>) -> Json<serde_json::Value> {
    let entries = state.activity.recent(200);
    Json(json!({ "activity": entries }))
}

/// POST /trade — one manual native→token swap.
pub async fn trade(
    State(state): State<AppState>,
    Json(req): Json<TradeRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let (Some(token), Some(amount)) = (req.token_address, req.amount_in_eth) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "tokenAddress and amountInEth are required" })),
        );
    };

    let chain = ChainKey::resolve(req.chain.as_deref());
    match state
        .trader
        .swap_native_for_token(chain, &token, &amount)
        .await
    {
        Ok(receipt) => (StatusCode::OK, Json(json!({ "receipt": receipt }))),
        Err(e) => (status_for(&e), error_body(&e)),
    }
}

/// POST /router — override a chain's router address for this process.
pub async fn set_router(
    State(state): State<AppState>,
    Json(req): Json<RouterRequest>,
) -> (StatusCode, Json<serde_json::Value>) {
    let Some(raw) = req.address else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "address is required" })),
        );
    };
    let Ok(address) = raw.parse() else {
        let e = EngineError::InvalidAddress(format!("router: {raw}"));
        return (status_for(&e), error_body(&e));
    };

    let chain = ChainKey::resolve(req.chain.as_deref());
    state.registry.set_override(chain, address);
    (StatusCode::OK, Json(json!({ "ok": true })))
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_request_parses_camel_case() {
        let req: AutoRequest = serde_json::from_str(
            r#"{"enable": true, "chain": "base", "maxSpendEth": "0.05",
                "maxSpendStable": "25", "stableToken": "USDC"}"#,
        )
        .unwrap();
        assert!(req.enable);
        assert_eq!(req.chain.as_deref(), Some("base"));
        assert_eq!(req.max_spend_eth.as_deref(), Some("0.05"));
        assert_eq!(req.stable_token, Some(StableToken::Usdc));
    }

    #[test]
    fn trade_request_fields_are_optional() {
        let req: TradeRequest = serde_json::from_str("{}").unwrap();
        assert!(req.token_address.is_none());
        assert!(req.amount_in_eth.is_none());
    }

    #[test]
    fn validation_errors_map_to_bad_request() {
        let e = EngineError::Validation {
            field: "amount".into(),
            message: "bad".into(),
        };
        assert_eq!(status_for(&e), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&EngineError::NotConfigured("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&EngineError::ChainCall("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
