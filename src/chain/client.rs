//! On-chain access behind a mockable seam.
//!
//! `ChainClient` is the single trait through which the engine touches a
//! blockchain: router reads (wrapped-native lookup, amounts-out), ERC-20
//! reads (decimals, allowance), and the three write paths (approve,
//! native swap, token swap). `RpcChainClient` is the production
//! implementation over alloy JSON-RPC providers; tests mock the trait.

use alloy::network::EthereumWallet;
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::ChainConfig;
use crate::error::EngineError;

sol! {
    /// Minimal UniswapV2-style router surface needed for quoting and
    /// fee-on-transfer-tolerant swaps.
    #[sol(rpc)]
    contract IDexRouter {
        function WETH() external view returns (address);
        function getAmountsOut(uint256 amountIn, address[] calldata path) external view returns (uint256[] memory amounts);
        function swapExactETHForTokensSupportingFeeOnTransferTokens(uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external payable;
        function swapExactTokensForTokensSupportingFeeOnTransferTokens(uint256 amountIn, uint256 amountOutMin, address[] calldata path, address to, uint256 deadline) external;
    }

    /// Minimal ERC-20 surface.
    #[sol(rpc)]
    contract IErc20 {
        function decimals() external view returns (uint8);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Confirmation of a submitted transaction.
#[derive(Debug, Clone, Copy)]
pub struct TxOutcome {
    pub tx_hash: B256,
    pub status: bool,
}

/// Everything the engine needs from a blockchain, per resolved chain.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Address of the server wallet, when a valid signing key is loaded.
    fn signer_address(&self) -> Option<Address>;

    /// The chain's wrapped-native token, as reported by the router.
    async fn wrapped_native(&self, cfg: &ChainConfig) -> Result<Address, EngineError>;

    /// Router pricing: expected output amounts along `path`.
    async fn amounts_out(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, EngineError>;

    async fn token_decimals(&self, cfg: &ChainConfig, token: Address)
        -> Result<u8, EngineError>;

    /// Current allowance of `spender` over the wallet's `token` balance.
    async fn allowance(
        &self,
        cfg: &ChainConfig,
        token: Address,
        spender: Address,
    ) -> Result<U256, EngineError>;

    /// Submit an approval and wait for its receipt. Approval is a
    /// blocking prerequisite — callers must not submit the swap until
    /// this confirms.
    async fn approve(
        &self,
        cfg: &ChainConfig,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, EngineError>;

    /// Submit a native→token swap sending `amount_in` as value and wait
    /// for the receipt.
    async fn swap_native(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        min_out: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<TxOutcome, EngineError>;

    /// Submit a token→token swap and wait for the receipt.
    async fn swap_tokens(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        min_out: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<TxOutcome, EngineError>;
}

// ---------------------------------------------------------------------------
// JSON-RPC implementation
// ---------------------------------------------------------------------------

/// Production `ChainClient` over alloy HTTP providers. Read calls use a
/// bare provider; write calls build a wallet-filled provider from the
/// held signer. Providers are constructed per call because each trade
/// may target a different chain.
pub struct RpcChainClient {
    signer: Option<PrivateKeySigner>,
}

impl RpcChainClient {
    pub fn new(signer: Option<PrivateKeySigner>) -> Self {
        Self { signer }
    }

    /// Parse a raw signing key. Invalid keys are reported, not fatal —
    /// the engine falls back to dry-run without a signer.
    pub fn from_raw_key(raw: Option<String>) -> Self {
        let signer = raw.and_then(|k| match k.parse::<PrivateKeySigner>() {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "Signing key failed to parse — running unsigned");
                None
            }
        });
        Self { signer }
    }

    fn parse_rpc_url(cfg: &ChainConfig) -> Result<Url, EngineError> {
        Url::parse(&cfg.rpc_url).map_err(|e| {
            EngineError::Configuration(format!("invalid RPC URL for {}: {e}", cfg.key))
        })
    }

    fn read_provider(cfg: &ChainConfig) -> Result<RootProvider, EngineError> {
        Ok(RootProvider::new_http(Self::parse_rpc_url(cfg)?))
    }

    fn write_provider(
        &self,
        cfg: &ChainConfig,
    ) -> Result<(impl Provider + Clone, Address), EngineError> {
        let signer = self.signer.clone().ok_or_else(|| {
            EngineError::Configuration("no signing key loaded for live execution".into())
        })?;
        let from = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(Self::parse_rpc_url(cfg)?);
        Ok((provider, from))
    }

    fn router_address(cfg: &ChainConfig) -> Result<Address, EngineError> {
        let (_, router) = cfg.wiring()?;
        Ok(router)
    }
}

fn chain_call(context: &str, e: impl std::fmt::Display) -> EngineError {
    EngineError::ChainCall(format!("{context}: {e}"))
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(|s| s.address())
    }

    async fn wrapped_native(&self, cfg: &ChainConfig) -> Result<Address, EngineError> {
        let router = IDexRouter::new(Self::router_address(cfg)?, Self::read_provider(cfg)?);
        let weth = router
            .WETH()
            .call()
            .await
            .map_err(|e| chain_call("router WETH() read", e))?;
        debug!(chain = %cfg.key, wrapped = %weth, "Resolved wrapped native token");
        Ok(weth)
    }

    async fn amounts_out(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        path: &[Address],
    ) -> Result<Vec<U256>, EngineError> {
        let router = IDexRouter::new(Self::router_address(cfg)?, Self::read_provider(cfg)?);
        router
            .getAmountsOut(amount_in, path.to_vec())
            .call()
            .await
            .map_err(|e| chain_call("router getAmountsOut", e))
    }

    async fn token_decimals(
        &self,
        cfg: &ChainConfig,
        token: Address,
    ) -> Result<u8, EngineError> {
        let erc20 = IErc20::new(token, Self::read_provider(cfg)?);
        erc20
            .decimals()
            .call()
            .await
            .map_err(|e| chain_call("ERC20 decimals", e))
    }

    async fn allowance(
        &self,
        cfg: &ChainConfig,
        token: Address,
        spender: Address,
    ) -> Result<U256, EngineError> {
        let owner = self.signer_address().ok_or_else(|| {
            EngineError::Configuration("no signing key loaded for allowance check".into())
        })?;
        let erc20 = IErc20::new(token, Self::read_provider(cfg)?);
        erc20
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| chain_call("ERC20 allowance", e))
    }

    async fn approve(
        &self,
        cfg: &ChainConfig,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<TxOutcome, EngineError> {
        let (provider, _) = self.write_provider(cfg)?;
        let erc20 = IErc20::new(token, provider);
        let pending = erc20
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| chain_call("ERC20 approve submit", e))?;
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| chain_call("ERC20 approve confirm", e))?;
        if !receipt.status() {
            return Err(EngineError::ChainCall(format!(
                "approval reverted: {}",
                receipt.transaction_hash
            )));
        }
        info!(token = %token, spender = %spender, tx = %receipt.transaction_hash, "Approval confirmed");
        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            status: true,
        })
    }

    async fn swap_native(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        min_out: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<TxOutcome, EngineError> {
        let (provider, from) = self.write_provider(cfg)?;
        let router = IDexRouter::new(Self::router_address(cfg)?, provider);
        let pending = router
            .swapExactETHForTokensSupportingFeeOnTransferTokens(
                min_out,
                path.to_vec(),
                from,
                deadline,
            )
            .value(amount_in)
            .send()
            .await
            .map_err(|e| chain_call("native swap submit", e))?;
        info!(tx = %pending.tx_hash(), chain = %cfg.key, "Submitted native swap");
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| chain_call("native swap confirm", e))?;
        if !receipt.status() {
            return Err(EngineError::ChainCall(format!(
                "swap reverted: {}",
                receipt.transaction_hash
            )));
        }
        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            status: true,
        })
    }

    async fn swap_tokens(
        &self,
        cfg: &ChainConfig,
        amount_in: U256,
        min_out: U256,
        path: &[Address],
        deadline: U256,
    ) -> Result<TxOutcome, EngineError> {
        let (provider, from) = self.write_provider(cfg)?;
        let router = IDexRouter::new(Self::router_address(cfg)?, provider);
        let pending = router
            .swapExactTokensForTokensSupportingFeeOnTransferTokens(
                amount_in,
                min_out,
                path.to_vec(),
                from,
                deadline,
            )
            .send()
            .await
            .map_err(|e| chain_call("token swap submit", e))?;
        info!(tx = %pending.tx_hash(), chain = %cfg.key, "Submitted token swap");
        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| chain_call("token swap confirm", e))?;
        if !receipt.status() {
            return Err(EngineError::ChainCall(format!(
                "swap reverted: {}",
                receipt.transaction_hash
            )));
        }
        Ok(TxOutcome {
            tx_hash: receipt.transaction_hash,
            status: true,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
