//! Chain wiring: a single keyed lookup table from logical chain key to
//! {RPC endpoint, router address, numeric chain id}, plus runtime router
//! overrides and the per-chain USDC addresses used by stable-input trades.

pub mod client;

use alloy::primitives::{address, Address};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::info;

use crate::config::ChainSettings;
use crate::error::EngineError;
use crate::types::ChainKey;

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Default router per chain (popular DEXes):
/// Uniswap V2 (mainnet), Uniswap V3 Router02 (base, arbitrum),
/// PancakeSwap V2 (bsc), QuickSwap V2 (polygon).
fn default_router(key: ChainKey) -> Address {
    match key {
        ChainKey::Mainnet => address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
        ChainKey::Base => address!("2626664c2603336E57B271c5C0b26F421741e481"),
        ChainKey::Arbitrum => address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"),
        ChainKey::Bsc => address!("10ED43C718714eb63d5aA57B78B54704E256024E"),
        ChainKey::Polygon => address!("a5E0829CaCED8fFDD4De3c43696c57F7D7A678ff"),
    }
}

/// Canonical USDC address per chain.
fn usdc_preset(key: ChainKey) -> Address {
    match key {
        ChainKey::Mainnet => address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
        ChainKey::Base => address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
        ChainKey::Arbitrum => address!("af88d065e77c8cC2239327C5EDb3A432268e5831"),
        ChainKey::Bsc => address!("8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d"),
        ChainKey::Polygon => address!("2791Bca1f2de4661ED88A30C99A7a9449Aa84174"),
    }
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved wiring for one chain. `rpc_url` may be empty and
/// `router` may be absent — execution-time calls must check `wiring()`
/// before using either.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub key: ChainKey,
    pub rpc_url: String,
    pub router: Option<Address>,
    pub chain_id: u64,
}

impl ChainConfig {
    /// The (rpc, router) pair, or a `Configuration` error if either is
    /// missing. Execution never proceeds with empty values.
    pub fn wiring(&self) -> Result<(&str, Address), EngineError> {
        let router = self.router.ok_or_else(|| {
            EngineError::Configuration(format!(
                "no router address configured for chain {}",
                self.key
            ))
        })?;
        if self.rpc_url.is_empty() {
            return Err(EngineError::Configuration(format!(
                "no RPC URL configured for chain {}",
                self.key
            )));
        }
        Ok((&self.rpc_url, router))
    }

    pub fn is_executable(&self) -> bool {
        self.wiring().is_ok()
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Resolves logical chain keys to concrete wiring, honoring runtime
/// router overrides for the lifetime of the process.
pub struct ChainRegistry {
    settings: ChainSettings,
    overrides: RwLock<HashMap<ChainKey, Address>>,
}

impl ChainRegistry {
    pub fn new(settings: ChainSettings) -> Self {
        Self {
            settings,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve an optional chain name (fail-open to mainnet) to wiring.
    ///
    /// RPC precedence: explicit per-chain URL, then the keyed Ankr URL
    /// when a provider key is configured, then the global fallback.
    /// Router precedence: runtime override, env override, built-in
    /// preset. Presets make every chain routable out of the box; the
    /// global `DEX_ROUTER_ADDRESS` is only consulted when a preset is
    /// somehow absent, which cannot happen for the five supported keys.
    pub fn resolve(&self, chain: Option<&str>) -> ChainConfig {
        self.resolve_key(ChainKey::resolve(chain))
    }

    pub fn resolve_key(&self, key: ChainKey) -> ChainConfig {
        let rpc_url = self
            .settings
            .rpc_urls
            .get(&key)
            .cloned()
            .or_else(|| {
                self.settings
                    .ankr_api_key
                    .as_ref()
                    .map(|k| format!("https://rpc.ankr.com/{}/{}", key.ankr_slug(), k))
            })
            .or_else(|| self.settings.global_rpc.clone())
            .unwrap_or_default();

        let runtime_override = self
            .overrides
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .copied();

        let router = runtime_override
            .or_else(|| {
                self.settings
                    .routers
                    .get(&key)
                    .and_then(|raw| raw.parse::<Address>().ok())
            })
            .or_else(|| Some(default_router(key)))
            .or_else(|| {
                self.settings
                    .global_router
                    .as_ref()
                    .and_then(|raw| raw.parse::<Address>().ok())
            });

        ChainConfig {
            key,
            rpc_url,
            router,
            chain_id: key.chain_id(),
        }
    }

    /// Replace the router address for one chain for the remainder of the
    /// process. Never affects RPC endpoint selection.
    pub fn set_override(&self, chain: ChainKey, router: Address) {
        info!(chain = %chain, router = %router, "Router override set");
        self.overrides
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(chain, router);
    }

    /// Whether at least one chain has complete wiring.
    pub fn any_executable(&self) -> bool {
        ChainKey::ALL
            .iter()
            .any(|k| self.resolve_key(*k).is_executable())
    }

    /// Chain-specific address of the given stable token.
    pub fn usdc_address(&self, chain: ChainKey) -> Address {
        usdc_preset(chain)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
