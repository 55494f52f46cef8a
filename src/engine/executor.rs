//! Swap execution.
//!
//! `SwapExecutor` turns a trade intent (chain, tokens, human-readable
//! amount) into either a simulated dry-run result or a confirmed
//! on-chain swap. Both paths share the same pipeline up to the point of
//! submission: resolve wiring, parse amounts, quote, derive the
//! slippage-adjusted minimum output. Dry-run mode short-circuits right
//! before anything would be signed, so a dry-run can never move funds.

use alloy::primitives::utils::{parse_ether, parse_units};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use super::quote::{InputAsset, Quoter};
use super::SwapService;
use crate::chain::client::ChainClient;
use crate::chain::{ChainConfig, ChainRegistry};
use crate::config::TradingConfig;
use crate::error::EngineError;
use crate::types::{ChainKey, SwapResult};

const BPS_DENOMINATOR: u64 = 10_000;

/// Slippage-adjusted minimum output: `amount_out * (10000 - bps) / 10000`
/// in integer arithmetic, rounding down.
pub fn min_out(amount_out: U256, slippage_bps: u32) -> U256 {
    let bps = u64::from(slippage_bps).min(BPS_DENOMINATOR);
    amount_out * U256::from(BPS_DENOMINATOR - bps) / U256::from(BPS_DENOMINATOR)
}

fn parse_address(raw: &str, what: &str) -> Result<Address, EngineError> {
    raw.parse::<Address>()
        .map_err(|_| EngineError::InvalidAddress(format!("{what}: {raw}")))
}

fn validation(field: &str, message: impl std::fmt::Display) -> EngineError {
    EngineError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct SwapExecutor {
    registry: Arc<ChainRegistry>,
    client: Arc<dyn ChainClient>,
    quoter: Arc<dyn Quoter>,
    slippage_bps: u32,
    deadline_mins: u64,
    dry_run: bool,
    /// Serializes write transactions from the single server wallet, so an
    /// approve and its dependent swap never interleave with another trade.
    wallet_lock: Mutex<()>,
}

impl SwapExecutor {
    pub fn new(
        registry: Arc<ChainRegistry>,
        client: Arc<dyn ChainClient>,
        quoter: Arc<dyn Quoter>,
        trading: &TradingConfig,
        dry_run: bool,
    ) -> Self {
        Self {
            registry,
            client,
            quoter,
            slippage_bps: trading.slippage_bps,
            deadline_mins: trading.deadline_mins,
            dry_run,
            wallet_lock: Mutex::new(()),
        }
    }

    /// Unix-seconds deadline for router calls.
    fn deadline(&self) -> U256 {
        let now = Utc::now().timestamp().max(0) as u64;
        U256::from(now + self.deadline_mins * 60)
    }

    fn resolved(&self, chain: ChainKey) -> Result<ChainConfig, EngineError> {
        let cfg = self.registry.resolve_key(chain);
        cfg.wiring()?;
        Ok(cfg)
    }

    fn dry_run_result(
        token_in: Option<String>,
        token_out: &str,
        amount_in: &str,
        minimum: U256,
        quote_source: &str,
    ) -> SwapResult {
        SwapResult::DryRun {
            dry_run: true,
            id: format!("dry-run-{}", Uuid::new_v4()),
            token_in,
            token_out: token_out.to_string(),
            amount_in: amount_in.to_string(),
            min_out: minimum.to_string(),
            quote_source: quote_source.to_string(),
        }
    }
}

#[async_trait]
impl SwapService for SwapExecutor {
    async fn swap_native_for_token(
        &self,
        chain: ChainKey,
        token_out: &str,
        amount_native: &str,
    ) -> Result<SwapResult, EngineError> {
        let cfg = self.resolved(chain)?;
        let out_addr = parse_address(token_out, "token_out")?;
        let amount_in =
            parse_ether(amount_native).map_err(|e| validation("amount_native", e))?;
        if amount_in.is_zero() {
            return Err(validation("amount_native", "amount must be positive"));
        }

        let wrapped = self.client.wrapped_native(&cfg).await?;
        let path = vec![wrapped, out_addr];
        let quote = self
            .quoter
            .quote(&cfg, &path, amount_in, InputAsset::Native)
            .await?;
        let minimum = min_out(quote.amount_out, self.slippage_bps);

        if self.dry_run {
            info!(chain = %chain, token_out, amount = amount_native, "Dry-run native swap");
            return Ok(Self::dry_run_result(
                None,
                token_out,
                amount_native,
                minimum,
                quote.source.as_str(),
            ));
        }

        let _wallet = self.wallet_lock.lock().await;
        let outcome = self
            .client
            .swap_native(&cfg, amount_in, minimum, &path, self.deadline())
            .await?;
        info!(chain = %chain, tx = %outcome.tx_hash, token_out, "Native swap confirmed");

        Ok(SwapResult::Executed {
            transaction_hash: outcome.tx_hash.to_string(),
            status: "confirmed".to_string(),
            token_in: None,
            token_out: token_out.to_string(),
            amount_in: amount_native.to_string(),
            min_out: minimum.to_string(),
        })
    }

    async fn swap_token_for_token(
        &self,
        chain: ChainKey,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
    ) -> Result<SwapResult, EngineError> {
        let cfg = self.resolved(chain)?;
        let (_, router) = cfg.wiring()?;
        let in_addr = parse_address(token_in, "token_in")?;
        let out_addr = parse_address(token_out, "token_out")?;

        let decimals = self.client.token_decimals(&cfg, in_addr).await?;
        let amount = parse_units(amount_in, decimals)
            .map_err(|e| validation("amount_in", e))?
            .get_absolute();
        if amount.is_zero() {
            return Err(validation("amount_in", "amount must be positive"));
        }

        let path = vec![in_addr, out_addr];
        let quote = self
            .quoter
            .quote(&cfg, &path, amount, InputAsset::Erc20)
            .await?;
        let minimum = min_out(quote.amount_out, self.slippage_bps);

        if self.dry_run {
            info!(chain = %chain, token_in, token_out, amount = amount_in, "Dry-run token swap");
            return Ok(Self::dry_run_result(
                Some(token_in.to_string()),
                token_out,
                amount_in,
                minimum,
                quote.source.as_str(),
            ));
        }

        // Allowance check and any approval must complete before the swap,
        // and nothing else may use the wallet in between.
        let _wallet = self.wallet_lock.lock().await;
        let allowance = self.client.allowance(&cfg, in_addr, router).await?;
        if allowance < amount {
            info!(chain = %chain, token_in, "Allowance short, approving router");
            self.client.approve(&cfg, in_addr, router, amount).await?;
        }

        let outcome = self
            .client
            .swap_tokens(&cfg, amount, minimum, &path, self.deadline())
            .await?;
        info!(chain = %chain, tx = %outcome.tx_hash, token_in, token_out, "Token swap confirmed");

        Ok(SwapResult::Executed {
            transaction_hash: outcome.tx_hash.to_string(),
            status: "confirmed".to_string(),
            token_in: Some(token_in.to_string()),
            token_out: token_out.to_string(),
            amount_in: amount_in.to_string(),
            min_out: minimum.to_string(),
        })
    }

    fn is_configured(&self) -> bool {
        self.client.signer_address().is_some() && self.registry.any_executable()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
