//! Shared types for the trading engine.
//!
//! These types form the data model used across all modules and the JSON
//! wire format served to the frontend proxy layer. Field names on the
//! wire are camelCase to match the existing dashboard contract.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Chain key
// ---------------------------------------------------------------------------

/// Logical chain identifier. Parsing is case-insensitive and fail-open:
/// anything that is not one of the five supported keys resolves to mainnet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainKey {
    #[default]
    Mainnet,
    Base,
    Arbitrum,
    Bsc,
    Polygon,
}

impl ChainKey {
    /// All supported chains, in preset order.
    pub const ALL: [ChainKey; 5] = [
        ChainKey::Mainnet,
        ChainKey::Base,
        ChainKey::Arbitrum,
        ChainKey::Bsc,
        ChainKey::Polygon,
    ];

    /// Resolve an optional user-supplied chain name. Unknown or missing
    /// input defaults to mainnet — deliberately fail-open, not an error.
    pub fn resolve(input: Option<&str>) -> Self {
        match input.map(|s| s.trim().to_lowercase()) {
            Some(v) if v == "base" => ChainKey::Base,
            Some(v) if v == "arbitrum" => ChainKey::Arbitrum,
            Some(v) if v == "bsc" => ChainKey::Bsc,
            Some(v) if v == "polygon" => ChainKey::Polygon,
            _ => ChainKey::Mainnet,
        }
    }

    /// Numeric EVM chain id.
    pub fn chain_id(self) -> u64 {
        match self {
            ChainKey::Mainnet => 1,
            ChainKey::Base => 8453,
            ChainKey::Arbitrum => 42161,
            ChainKey::Bsc => 56,
            ChainKey::Polygon => 137,
        }
    }

    /// Slug used by the Ankr fallback RPC provider.
    pub fn ankr_slug(self) -> &'static str {
        match self {
            ChainKey::Mainnet => "eth",
            ChainKey::Base => "base",
            ChainKey::Arbitrum => "arbitrum",
            ChainKey::Bsc => "bsc",
            ChainKey::Polygon => "polygon",
        }
    }

    /// Suffix of the per-chain environment variables
    /// (`RPC_URL_<SUFFIX>`, `DEX_ROUTER_ADDRESS_<SUFFIX>`).
    pub fn env_suffix(self) -> &'static str {
        match self {
            ChainKey::Mainnet => "MAINNET",
            ChainKey::Base => "BASE",
            ChainKey::Arbitrum => "ARBITRUM",
            ChainKey::Bsc => "BSC",
            ChainKey::Polygon => "POLYGON",
        }
    }
}

impl fmt::Display for ChainKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainKey::Mainnet => "mainnet",
            ChainKey::Base => "base",
            ChainKey::Arbitrum => "arbitrum",
            ChainKey::Bsc => "bsc",
            ChainKey::Polygon => "polygon",
        };
        write!(f, "{name}")
    }
}

// ---------------------------------------------------------------------------
// Opportunity
// ---------------------------------------------------------------------------

/// A scored candidate token derived from a market-data pair record.
///
/// Produced fresh on every scan, never mutated. At most one Opportunity
/// per base-token address per scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liquidity_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_h24: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_h1: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_h24: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sparkline: Option<Vec<f64>>,
}

impl Opportunity {
    /// A bare placeholder opportunity, used by the scanner fallback set.
    pub fn placeholder(address: &str, name: &str, symbol: &str, score: f64) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            score,
            price_usd: None,
            liquidity_usd: None,
            volume_h24: None,
            change_h1: None,
            change_h24: None,
            chain_id: None,
            pair_address: None,
            sparkline: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Trade preferences
// ---------------------------------------------------------------------------

/// The stable input asset for token→token auto-trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StableToken {
    #[serde(rename = "USDC")]
    Usdc,
}

/// Preferences governing auto-trading. Owned exclusively by the
/// scheduler; replaced atomically on every enable call and read as a
/// consistent snapshot for the duration of a tick.
#[derive(Debug, Clone, Default)]
pub struct TradePreferences {
    pub chain: ChainKey,
    /// Human-readable native spend per trade, e.g. "0.01".
    pub max_spend_native: Option<String>,
    /// Human-readable stable spend per trade, e.g. "10".
    pub max_spend_stable: Option<String>,
    pub stable_token: Option<StableToken>,
}

// ---------------------------------------------------------------------------
// Activity log entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    AutoTradeNative,
    AutoTradeStable,
    Error,
}

/// One engine action. Entries are append-only and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ActivityEntry {
    pub time: DateTime<Utc>,
    pub action: ActivityAction,
    pub details: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Swap results
// ---------------------------------------------------------------------------

/// Outcome of a swap operation: either a simulated dry-run result or a
/// confirmed on-chain receipt. Both carry enough information (tokens,
/// amounts, identifying hash or dry-run tag) to be logged as activity.
///
/// `min_out` is the slippage-adjusted minimum output in base units,
/// rendered as a decimal string.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SwapResult {
    #[serde(rename_all = "camelCase")]
    DryRun {
        dry_run: bool,
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token_in: Option<String>,
        token_out: String,
        amount_in: String,
        min_out: String,
        quote_source: String,
    },
    #[serde(rename_all = "camelCase")]
    Executed {
        transaction_hash: String,
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        token_in: Option<String>,
        token_out: String,
        amount_in: String,
        min_out: String,
    },
}

impl SwapResult {
    pub fn is_dry_run(&self) -> bool {
        matches!(self, SwapResult::DryRun { .. })
    }

    pub fn min_out(&self) -> &str {
        match self {
            SwapResult::DryRun { min_out, .. } => min_out,
            SwapResult::Executed { min_out, .. } => min_out,
        }
    }

    pub fn token_out(&self) -> &str {
        match self {
            SwapResult::DryRun { token_out, .. } => token_out,
            SwapResult::Executed { token_out, .. } => token_out,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
