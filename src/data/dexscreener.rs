//! DexScreener market-data integration.
//!
//! Used for opportunity discovery (pair search across seed terms) and as
//! the degraded-mode spot-price source for the quote fallback.
//!
//! API docs: https://docs.dexscreener.com/
//! Base URL: https://api.dexscreener.com/latest/dex
//! Auth: none required.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::error::EngineError;

const BASE_URL: &str = "https://api.dexscreener.com/latest/dex";

// ---------------------------------------------------------------------------
// API response types (DexScreener JSON → Rust)
// ---------------------------------------------------------------------------

/// One DEX pair as returned by `/search`. Only the fields the engine
/// needs are deserialized; everything is optional because the feed is
/// not under our control.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRecord {
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub pair_address: Option<String>,
    #[serde(default)]
    pub base_token: Option<BaseToken>,
    /// Spot price in USD, serialized by the API as a string.
    #[serde(default)]
    pub price_usd: Option<String>,
    #[serde(default)]
    pub volume: Option<VolumeStats>,
    #[serde(default)]
    pub price_change: Option<ChangeStats>,
    #[serde(default)]
    pub liquidity: Option<LiquidityStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseToken {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeStats {
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeStats {
    #[serde(default)]
    pub h1: Option<f64>,
    #[serde(default)]
    pub h24: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LiquidityStats {
    #[serde(default)]
    pub usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pairs: Option<Vec<PairRecord>>,
}

impl PairRecord {
    pub fn base_address(&self) -> Option<&str> {
        self.base_token
            .as_ref()
            .and_then(|t| t.address.as_deref())
            .filter(|a| !a.is_empty())
    }

    pub fn volume_h24(&self) -> f64 {
        self.volume.as_ref().and_then(|v| v.h24).unwrap_or(0.0)
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity.as_ref().and_then(|l| l.usd).unwrap_or(0.0)
    }

    pub fn change_h1(&self) -> f64 {
        self.price_change.as_ref().and_then(|c| c.h1).unwrap_or(0.0)
    }

    pub fn change_h24(&self) -> f64 {
        self.price_change
            .as_ref()
            .and_then(|c| c.h24)
            .unwrap_or(0.0)
    }

    pub fn price_usd_f64(&self) -> f64 {
        self.price_usd
            .as_deref()
            .and_then(|p| p.parse().ok())
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// DexScreener HTTP client. Every request carries its own timeout so a
/// hung feed can never stall a scan or a quote.
pub struct DexScreenerClient {
    http: Client,
}

impl DexScreenerClient {
    pub fn new(timeout: Duration) -> Result<Self, EngineError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::ExternalFetch(format!("http client build: {e}")))?;
        Ok(Self { http })
    }

    /// Search pairs matching a free-text query. Returns an empty list
    /// when the API responds without a `pairs` array.
    pub async fn search_pairs(&self, query: &str) -> Result<Vec<PairRecord>, EngineError> {
        let url = format!("{BASE_URL}/search?q={}", urlencoding::encode(query));
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| EngineError::ExternalFetch(format!("search '{query}': {e}")))?;

        if !resp.status().is_success() {
            return Err(EngineError::ExternalFetch(format!(
                "search '{query}': HTTP {}",
                resp.status()
            )));
        }

        let body: SearchResponse = resp
            .json()
            .await
            .map_err(|e| EngineError::ExternalFetch(format!("search '{query}' decode: {e}")))?;

        let pairs = body.pairs.unwrap_or_default();
        debug!(query, pairs = pairs.len(), "DexScreener search complete");
        Ok(pairs)
    }

    /// Best-effort spot USD price for a token: the first pair returned
    /// when searching for its address. None when the feed has no price.
    pub async fn spot_price_usd(&self, token: &str) -> Result<Option<f64>, EngineError> {
        let pairs = self.search_pairs(token).await?;
        let price = pairs.first().map(|p| p.price_usd_f64()).filter(|p| *p > 0.0);
        Ok(price)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PAIR: &str = r#"{
        "chainId": "ethereum",
        "pairAddress": "0xPair",
        "baseToken": {"address": "0xBase", "name": "Pepe", "symbol": "PEPE"},
        "priceUsd": "0.0000012",
        "volume": {"h24": 1500000.5},
        "priceChange": {"h1": 2.5, "h24": -8.0},
        "liquidity": {"usd": 420000.0}
    }"#;

    #[test]
    fn parses_full_pair_record() {
        let pair: PairRecord = serde_json::from_str(SAMPLE_PAIR).unwrap();
        assert_eq!(pair.base_address(), Some("0xBase"));
        assert_eq!(pair.volume_h24(), 1_500_000.5);
        assert_eq!(pair.liquidity_usd(), 420_000.0);
        assert_eq!(pair.change_h1(), 2.5);
        assert_eq!(pair.change_h24(), -8.0);
        assert!((pair.price_usd_f64() - 0.0000012).abs() < 1e-12);
        assert_eq!(pair.chain_id.as_deref(), Some("ethereum"));
    }

    #[test]
    fn tolerates_sparse_records() {
        let pair: PairRecord = serde_json::from_str(r#"{"chainId": "base"}"#).unwrap();
        assert_eq!(pair.base_address(), None);
        assert_eq!(pair.volume_h24(), 0.0);
        assert_eq!(pair.liquidity_usd(), 0.0);
        assert_eq!(pair.price_usd_f64(), 0.0);
    }

    #[test]
    fn empty_base_address_is_none() {
        let pair: PairRecord =
            serde_json::from_str(r#"{"baseToken": {"address": ""}}"#).unwrap();
        assert_eq!(pair.base_address(), None);
    }

    #[test]
    fn unparseable_price_reads_as_zero() {
        let pair: PairRecord =
            serde_json::from_str(r#"{"priceUsd": "not-a-number"}"#).unwrap();
        assert_eq!(pair.price_usd_f64(), 0.0);
    }

    #[test]
    fn search_response_without_pairs_is_empty() {
        let body: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(body.pairs.is_none());
        let body: SearchResponse =
            serde_json::from_str(r#"{"pairs": null}"#).unwrap();
        assert!(body.pairs.is_none());
    }
}
