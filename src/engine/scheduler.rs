//! Auto-trading scheduler.
//!
//! Owns the periodic scan → select → swap loop. At most one loop task
//! runs at a time; enable is idempotent (re-enabling only replaces the
//! preferences) and disable stops the timer without interrupting a tick
//! already in flight. Preferences are replaced atomically on enable and
//! read as one snapshot at the start of each tick.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::activity::ActivityLog;
use super::{OpportunitySource, SwapService};
use crate::chain::ChainRegistry;
use crate::config::TradingConfig;
use crate::error::EngineError;
use crate::types::{ActivityAction, Opportunity, TradePreferences};

#[derive(Default)]
struct LoopState {
    enabled: bool,
    stop: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
}

/// One tick's worth of collaborators, cloned into the loop task.
#[derive(Clone)]
struct TickRunner {
    scanner: Arc<dyn OpportunitySource>,
    trader: Arc<dyn SwapService>,
    registry: Arc<ChainRegistry>,
    activity: ActivityLog,
    prefs: Arc<RwLock<TradePreferences>>,
    default_spend_native: String,
    default_spend_stable: String,
}

impl TickRunner {
    async fn run_loop(self, period: Duration, mut stop: watch::Receiver<bool>) {
        let mut interval = tokio::time::interval(period);
        // A tick that overruns the period must not cause a burst of
        // catch-up trades.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_secs = period.as_secs(), "Auto-trading loop started");

        loop {
            tokio::select! {
                _ = interval.tick() => self.run_tick().await,
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Auto-trading loop stopped");
    }

    /// One tick: snapshot preferences, scan, trade the single
    /// highest-scoring opportunity, record the outcome.
    async fn run_tick(&self) {
        let prefs = self.prefs.read().await.clone();
        let opportunities = self.scanner.scan(prefs.chain).await;

        let Some(best) = opportunities.iter().max_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            return;
        };

        info!(
            chain = %prefs.chain,
            token = %best.address,
            symbol = %best.symbol,
            score = best.score,
            "Tick selected opportunity"
        );

        if prefs.stable_token.is_some() {
            self.trade_stable(&prefs, best).await;
        } else {
            self.trade_native(&prefs, best).await;
        }
    }

    async fn trade_native(&self, prefs: &TradePreferences, best: &Opportunity) {
        let amount = prefs
            .max_spend_native
            .clone()
            .unwrap_or_else(|| self.default_spend_native.clone());
        let outcome = self
            .trader
            .swap_native_for_token(prefs.chain, &best.address, &amount)
            .await;
        self.record(ActivityAction::AutoTradeNative, prefs, best, &amount, outcome);
    }

    async fn trade_stable(&self, prefs: &TradePreferences, best: &Opportunity) {
        let amount = prefs
            .max_spend_stable
            .clone()
            .unwrap_or_else(|| self.default_spend_stable.clone());
        let stable_in = self.registry.usdc_address(prefs.chain).to_string();
        let outcome = self
            .trader
            .swap_token_for_token(prefs.chain, &stable_in, &best.address, &amount)
            .await;
        self.record(ActivityAction::AutoTradeStable, prefs, best, &amount, outcome);
    }

    fn record(
        &self,
        action: ActivityAction,
        prefs: &TradePreferences,
        best: &Opportunity,
        amount: &str,
        outcome: Result<crate::types::SwapResult, EngineError>,
    ) {
        match outcome {
            Ok(receipt) => self.activity.append(
                action,
                serde_json::json!({
                    "chain": prefs.chain.to_string(),
                    "token": best.address,
                    "symbol": best.symbol,
                    "score": best.score,
                    "amountIn": amount,
                    "receipt": receipt,
                }),
            ),
            Err(e) => {
                error!(chain = %prefs.chain, token = %best.address, error = %e, "Auto-trade failed");
                self.activity.append(
                    ActivityAction::Error,
                    serde_json::json!({
                        "chain": prefs.chain.to_string(),
                        "token": best.address,
                        "symbol": best.symbol,
                        "error": e.to_string(),
                    }),
                );
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

pub struct TradingScheduler {
    runner: TickRunner,
    period: Duration,
    state: Mutex<LoopState>,
}

impl TradingScheduler {
    pub fn new(
        scanner: Arc<dyn OpportunitySource>,
        trader: Arc<dyn SwapService>,
        registry: Arc<ChainRegistry>,
        activity: ActivityLog,
        trading: &TradingConfig,
    ) -> Self {
        Self {
            runner: TickRunner {
                scanner,
                trader,
                registry,
                activity,
                prefs: Arc::new(RwLock::new(TradePreferences::default())),
                default_spend_native: trading.default_spend_native.clone(),
                default_spend_stable: trading.default_spend_stable.clone(),
            },
            period: Duration::from_secs(trading.tick_secs.max(1)),
            state: Mutex::new(LoopState::default()),
        }
    }

    /// Enable auto-trading with the given preferences. Refused when the
    /// trade prerequisites are missing; the loop stays disabled. Calling
    /// enable while already enabled replaces the preferences without
    /// starting a second loop.
    pub async fn enable(&self, prefs: TradePreferences) -> Result<(), EngineError> {
        if !self.runner.trader.is_configured() {
            return Err(EngineError::NotConfigured(
                "wallet key or chain wiring missing".into(),
            ));
        }

        *self.runner.prefs.write().await = prefs;

        let mut state = self.state.lock().await;
        if state.enabled {
            info!("Auto-trading already enabled, preferences updated");
            return Ok(());
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.runner.clone().run_loop(self.period, stop_rx));
        state.enabled = true;
        state.stop = Some(stop_tx);
        state.task = Some(task);
        info!("Auto-trading enabled");
        Ok(())
    }

    /// Disable auto-trading. A no-op when already disabled. An in-flight
    /// tick is allowed to finish; only the timer stops.
    pub async fn disable(&self) {
        let mut state = self.state.lock().await;
        if !state.enabled {
            return;
        }
        if let Some(stop) = state.stop.take() {
            let _ = stop.send(true);
        }
        state.task.take();
        state.enabled = false;
        info!("Auto-trading disabled");
    }

    pub async fn is_enabled(&self) -> bool {
        self.state.lock().await.enabled
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
