//! Configuration loading from TOML with environment variable overlay.
//!
//! Non-secret defaults (server port, tick period, slippage, deadline)
//! live in an optional `config.toml`. Chain wiring and secrets come from
//! the environment (loaded via `.env` at startup): per-chain RPC URLs,
//! router overrides, the Ankr provider key, and the signing key. The
//! signing key is held in a `SecretString` and never logged.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::types::ChainKey;

/// Placeholder key shipped in `.env.example` files; never treated as valid.
const PLACEHOLDER_KEY: &str = "0xYOUR_PRIVATE_KEY";

// ---------------------------------------------------------------------------
// File-backed settings
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3001 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TradingConfig {
    /// Auto-trade tick period in seconds.
    pub tick_secs: u64,
    /// Slippage tolerance in basis points (500 = 5%).
    pub slippage_bps: u32,
    /// Transaction deadline in minutes from submission.
    pub deadline_mins: u64,
    /// Explicit dry-run flag. The effective flag also turns on when the
    /// signing key is absent or invalid.
    pub dry_run: bool,
    /// Native spend per auto-trade when preferences leave it unset.
    pub default_spend_native: String,
    /// Stable spend per auto-trade when preferences leave it unset.
    pub default_spend_stable: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            slippage_bps: 500,
            deadline_mins: 15,
            dry_run: false,
            default_spend_native: "0.01".to_string(),
            default_spend_stable: "10".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScannerConfig {
    /// Per-seed-query timeout in seconds.
    pub query_timeout_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
struct FileConfig {
    server: ServerConfig,
    trading: TradingConfig,
    scanner: ScannerConfig,
}

// ---------------------------------------------------------------------------
// Chain wiring from the environment
// ---------------------------------------------------------------------------

/// Environment-sourced chain wiring, resolved once at startup.
/// Runtime router overrides live in the registry, not here.
#[derive(Debug, Clone, Default)]
pub struct ChainSettings {
    /// Global fallback RPC URL (`RPC_URL`).
    pub global_rpc: Option<String>,
    /// Global fallback router (`DEX_ROUTER_ADDRESS`), kept as a raw string
    /// and parsed at resolution time.
    pub global_router: Option<String>,
    /// Shared provider key for the keyed Ankr fallback (`ANKR_API_KEY`).
    pub ankr_api_key: Option<String>,
    /// Per-chain explicit RPC URLs (`RPC_URL_<CHAIN>`).
    pub rpc_urls: HashMap<ChainKey, String>,
    /// Per-chain router overrides (`DEX_ROUTER_ADDRESS_<CHAIN>`).
    pub routers: HashMap<ChainKey, String>,
}

impl ChainSettings {
    pub fn from_env() -> Self {
        let mut rpc_urls = HashMap::new();
        let mut routers = HashMap::new();
        for key in ChainKey::ALL {
            if let Some(url) = non_empty_env(&format!("RPC_URL_{}", key.env_suffix())) {
                rpc_urls.insert(key, url);
            }
            if let Some(addr) =
                non_empty_env(&format!("DEX_ROUTER_ADDRESS_{}", key.env_suffix()))
            {
                routers.insert(key, addr);
            }
        }
        Self {
            global_rpc: non_empty_env("RPC_URL"),
            global_router: non_empty_env("DEX_ROUTER_ADDRESS"),
            ankr_api_key: non_empty_env("ANKR_API_KEY"),
            rpc_urls,
            routers,
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Top-level application configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub trading: TradingConfig,
    pub scanner: ScannerConfig,
    pub chains: ChainSettings,
    signing_key: Option<SecretString>,
}

impl AppConfig {
    /// Load configuration: optional TOML file, then environment overlay.
    /// A missing file is not an error — env-only deployments are common.
    pub fn load(path: &str) -> Result<Self> {
        let file: FileConfig = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {path}"))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {path}"))?
        } else {
            FileConfig::default()
        };

        let mut cfg = Self {
            server: file.server,
            trading: file.trading,
            scanner: file.scanner,
            chains: ChainSettings::from_env(),
            signing_key: None,
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = non_empty_env("PORT").and_then(|v| v.parse().ok()) {
            self.server.port = v;
        }
        if let Some(v) = non_empty_env("SLIPPAGE_BPS").and_then(|v| v.parse().ok()) {
            self.trading.slippage_bps = v;
        }
        if let Some(v) = non_empty_env("TX_DEADLINE_MINUTES").and_then(|v| v.parse().ok()) {
            self.trading.deadline_mins = v;
        }
        if let Some(v) = non_empty_env("AUTO_TICK_SECS").and_then(|v| v.parse().ok()) {
            self.trading.tick_secs = v;
        }
        if let Some(v) = non_empty_env("DRY_RUN") {
            self.trading.dry_run = v.eq_ignore_ascii_case("true");
        }
        // Slippage above 100% makes the min-out arithmetic underflow.
        self.trading.slippage_bps = self.trading.slippage_bps.min(10_000);

        if let Some(raw) = non_empty_env("PRIVATE_KEY") {
            if is_plausible_key(&raw) {
                self.signing_key = Some(SecretString::new(raw));
            } else {
                tracing::warn!(
                    "PRIVATE_KEY is missing, a placeholder, or too short — forcing dry-run"
                );
            }
        }
    }

    /// The validated signing key, if one is configured.
    pub fn signing_key(&self) -> Option<&SecretString> {
        self.signing_key.as_ref()
    }

    /// Effective dry-run: the explicit flag, or no valid signing key.
    /// A safety default — the engine never attempts a live transaction
    /// with an invalid or missing key.
    pub fn effective_dry_run(&self) -> bool {
        self.trading.dry_run || self.signing_key.is_none()
    }

    /// Expose the raw key for signer construction. Callers must not log it.
    pub fn expose_signing_key(&self) -> Option<String> {
        self.signing_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server: ServerConfig::default(),
            trading: TradingConfig::default(),
            scanner: ScannerConfig::default(),
            chains: ChainSettings::default(),
            signing_key: None,
        }
    }
}

/// A key is plausible when it is non-empty, not the documented
/// placeholder, and at least 64 hex characters after the 0x prefix.
fn is_plausible_key(raw: &str) -> bool {
    if raw.is_empty() || raw == PLACEHOLDER_KEY {
        return false;
    }
    raw.trim_start_matches("0x").len() >= 64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let trading = TradingConfig::default();
        assert_eq!(trading.tick_secs, 60);
        assert_eq!(trading.slippage_bps, 500);
        assert_eq!(trading.deadline_mins, 15);
        assert!(!trading.dry_run);
        assert_eq!(trading.default_spend_native, "0.01");
        assert_eq!(ServerConfig::default().port, 3001);
    }

    #[test]
    fn placeholder_and_short_keys_rejected() {
        assert!(!is_plausible_key(""));
        assert!(!is_plausible_key("0xYOUR_PRIVATE_KEY"));
        assert!(!is_plausible_key("0xdeadbeef"));
        assert!(is_plausible_key(&format!("0x{}", "a".repeat(64))));
        assert!(is_plausible_key(&"b".repeat(64)));
    }

    #[test]
    fn missing_key_forces_dry_run() {
        let cfg = AppConfig::for_tests();
        assert!(cfg.signing_key().is_none());
        assert!(cfg.effective_dry_run());
    }

    #[test]
    fn parses_partial_toml() {
        let file: FileConfig = toml::from_str(
            r#"
            [trading]
            slippage_bps = 300
            "#,
        )
        .unwrap();
        assert_eq!(file.trading.slippage_bps, 300);
        assert_eq!(file.trading.deadline_mins, 15);
        assert_eq!(file.server.port, 3001);
    }
}
