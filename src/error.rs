//! Error taxonomy for the trading engine.
//!
//! Every failure surfaced by the core falls into one of these variants.
//! Scanner-level external failures are absorbed into the placeholder
//! fallback and never reach callers; executor-level failures propagate to
//! the scheduler tick, which records them as ERROR activity entries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or invalid chain wiring (RPC URL, router address).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Auto-trading prerequisites absent (wallet key, chain wiring).
    #[error("auto-trading not configured: {0}")]
    NotConfigured(String),

    /// No usable output estimate from the router or the fallback feed.
    #[error("quote unavailable: {0}")]
    Quote(String),

    /// On-chain call or submission failure, including reverts.
    #[error("chain call failed: {0}")]
    ChainCall(String),

    /// Market-data API unavailable or returned garbage.
    #[error("market data fetch failed: {0}")]
    ExternalFetch(String),

    /// A token or router address that does not parse.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// A malformed request parameter (amounts, chain names).
    #[error("validation failed for {field}: {message}")]
    Validation { field: String, message: String },
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
