//! Swap quoting with degraded-mode fallback pricing.
//!
//! Primary path: `getAmountsOut` on the chain's router. Fallback, for
//! native-input swaps only: a DexScreener spot USD price for the output
//! token combined with an assumed native reference price. Fallback
//! numbers are low-confidence; every quote carries its source so callers
//! can tell the two apart.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::chain::client::ChainClient;
use crate::chain::ChainConfig;
use crate::data::dexscreener::DexScreenerClient;
use crate::error::EngineError;

/// Assumed USD price of the native asset used by the fallback estimate.
/// A placeholder heuristic, not a price feed; quotes derived from it
/// are tagged `SpotPrice`.
const NATIVE_USD_REFERENCE: f64 = 3000.0;

/// Decimals assumed for the output token in the fallback estimate.
const FALLBACK_OUT_DECIMALS: f64 = 1e18;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAsset {
    Native,
    Erc20,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    /// Priced by the router's `getAmountsOut`.
    Router,
    /// Best-effort estimate from the external spot-price feed.
    SpotPrice,
}

impl QuoteSource {
    pub fn as_str(self) -> &'static str {
        match self {
            QuoteSource::Router => "router",
            QuoteSource::SpotPrice => "spot-price",
        }
    }
}

/// An output estimate for a swap path.
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub amount_out: U256,
    pub source: QuoteSource,
}

/// Quoting seam between the executor and the pricing machinery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Quoter: Send + Sync {
    async fn quote(
        &self,
        cfg: &ChainConfig,
        path: &[Address],
        amount_in: U256,
        input: InputAsset,
    ) -> Result<Quote, EngineError>;
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct QuoteEngine {
    client: Arc<dyn ChainClient>,
    feed: Arc<DexScreenerClient>,
}

impl QuoteEngine {
    pub fn new(client: Arc<dyn ChainClient>, feed: Arc<DexScreenerClient>) -> Self {
        Self { client, feed }
    }

    /// Derive an approximate output from a spot USD price. Assumes the
    /// native reference price and an 18-decimal output token.
    fn estimate_from_spot(amount_in: U256, price_usd: f64) -> Option<U256> {
        if price_usd <= 0.0 {
            return None;
        }
        let wei: u128 = amount_in.try_into().ok()?;
        let native_amount = wei as f64 / 1e18;
        let tokens_out = native_amount * (NATIVE_USD_REFERENCE / price_usd);
        let raw = tokens_out * FALLBACK_OUT_DECIMALS;
        if !raw.is_finite() || raw < 0.0 || raw >= u128::MAX as f64 {
            return None;
        }
        Some(U256::from(raw as u128))
    }
}

#[async_trait]
impl Quoter for QuoteEngine {
    async fn quote(
        &self,
        cfg: &ChainConfig,
        path: &[Address],
        amount_in: U256,
        input: InputAsset,
    ) -> Result<Quote, EngineError> {
        let primary_err = match self.client.amounts_out(cfg, amount_in, path).await {
            Ok(amounts) => match amounts.last() {
                Some(out) if *out > U256::ZERO => {
                    return Ok(Quote {
                        amount_out: *out,
                        source: QuoteSource::Router,
                    });
                }
                _ => EngineError::Quote("router returned no usable output amount".into()),
            },
            Err(e) => e,
        };

        // Fallback pricing applies to native input only; the original
        // token→token path has no degraded mode.
        if input != InputAsset::Native {
            return Err(primary_err);
        }

        let Some(token_out) = path.last() else {
            return Err(primary_err);
        };

        warn!(
            chain = %cfg.key,
            error = %primary_err,
            "Router quote failed, trying spot-price fallback"
        );

        match self.feed.spot_price_usd(&token_out.to_string()).await {
            Ok(Some(price_usd)) => {
                if let Some(amount_out) = Self::estimate_from_spot(amount_in, price_usd) {
                    debug!(price_usd, %amount_out, "Fallback quote derived from spot price");
                    return Ok(Quote {
                        amount_out,
                        source: QuoteSource::SpotPrice,
                    });
                }
                Err(primary_err)
            }
            // Both paths failed: propagate the original router error.
            _ => Err(primary_err),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::client::MockChainClient;
    use crate::types::ChainKey;
    use std::time::Duration;

    fn cfg() -> ChainConfig {
        ChainConfig {
            key: ChainKey::Mainnet,
            rpc_url: "https://rpc.example.com".into(),
            router: Some(Address::ZERO),
            chain_id: 1,
        }
    }

    fn feed() -> Arc<DexScreenerClient> {
        Arc::new(DexScreenerClient::new(Duration::from_secs(1)).unwrap())
    }

    fn path() -> Vec<Address> {
        vec![Address::ZERO, Address::repeat_byte(0xAA)]
    }

    #[tokio::test]
    async fn router_quote_wins_when_available() {
        let mut client = MockChainClient::new();
        client
            .expect_amounts_out()
            .returning(|_, amount_in, _| Ok(vec![amount_in, U256::from(1000u64)]));

        let engine = QuoteEngine::new(Arc::new(client), feed());
        let quote = engine
            .quote(&cfg(), &path(), U256::from(10u64), InputAsset::Native)
            .await
            .unwrap();
        assert_eq!(quote.amount_out, U256::from(1000u64));
        assert_eq!(quote.source, QuoteSource::Router);
    }

    #[tokio::test]
    async fn erc20_input_propagates_router_error() {
        let mut client = MockChainClient::new();
        client
            .expect_amounts_out()
            .returning(|_, _, _| Err(EngineError::ChainCall("unrouteable path".into())));

        let engine = QuoteEngine::new(Arc::new(client), feed());
        let err = engine
            .quote(&cfg(), &path(), U256::from(10u64), InputAsset::Erc20)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ChainCall(_)));
    }

    #[test]
    fn spot_estimate_matches_reference_arithmetic() {
        // 1 native unit at a 1500 USD token price: 3000/1500 = 2 tokens out.
        let amount_in = U256::from(10u64).pow(U256::from(18u64));
        let out = QuoteEngine::estimate_from_spot(amount_in, 1500.0).unwrap();
        assert_eq!(out, U256::from(2u64) * U256::from(10u64).pow(U256::from(18u64)));
    }

    #[test]
    fn spot_estimate_rejects_zero_price() {
        assert!(QuoteEngine::estimate_from_spot(U256::from(1u64), 0.0).is_none());
        assert!(QuoteEngine::estimate_from_spot(U256::from(1u64), -1.0).is_none());
    }

    #[test]
    fn quote_source_labels_are_stable() {
        assert_eq!(QuoteSource::Router.as_str(), "router");
        assert_eq!(QuoteSource::SpotPrice.as_str(), "spot-price");
    }
}
