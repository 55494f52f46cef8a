//! Core engine — scan → score → select → swap, driven by the scheduler.
//!
//! The two traits below are the seams between the scheduler and the
//! outside world: `OpportunitySource` produces ranked candidates and
//! `SwapService` moves money. Production wires `OpportunityScanner` and
//! `SwapExecutor`; tests substitute deterministic stubs.

pub mod activity;
pub mod executor;
pub mod quote;
pub mod scanner;
pub mod scheduler;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::types::{ChainKey, Opportunity, SwapResult};

/// Produces scored token opportunities. Implementations absorb external
/// failures internally — a scan never errors, at worst it returns the
/// fixed placeholder set.
#[async_trait]
pub trait OpportunitySource: Send + Sync {
    async fn scan(&self, chain: ChainKey) -> Vec<Opportunity>;
}

/// Executes swaps from the server-held wallet.
#[async_trait]
pub trait SwapService: Send + Sync {
    /// Swap `amount_native` (human units, e.g. "0.01") of the chain's
    /// native asset for `token_out`.
    async fn swap_native_for_token(
        &self,
        chain: ChainKey,
        token_out: &str,
        amount_native: &str,
    ) -> Result<SwapResult, EngineError>;

    /// Swap `amount_in` (human units of `token_in`) for `token_out`,
    /// approving the router first if the allowance is short.
    async fn swap_token_for_token(
        &self,
        chain: ChainKey,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
    ) -> Result<SwapResult, EngineError>;

    /// Whether live trade prerequisites are satisfied: a valid signing
    /// key and at least one chain with complete RPC/router wiring.
    fn is_configured(&self) -> bool;
}
