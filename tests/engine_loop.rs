//! End-to-end loop test: scheduler driving a stub scanner and trader
//! through the real activity log, exercised via the public crate API.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use autotrader::chain::ChainRegistry;
use autotrader::config::{ChainSettings, TradingConfig};
use autotrader::engine::activity::ActivityLog;
use autotrader::engine::scheduler::TradingScheduler;
use autotrader::engine::{OpportunitySource, SwapService};
use autotrader::error::EngineError;
use autotrader::types::{
    ActivityAction, ChainKey, Opportunity, SwapResult, TradePreferences,
};

struct FixedScanner(Vec<Opportunity>);

#[async_trait]
impl OpportunitySource for FixedScanner {
    async fn scan(&self, _chain: ChainKey) -> Vec<Opportunity> {
        self.0.clone()
    }
}

struct CountingTrader {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingTrader {
    fn new(fail: bool) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail,
        }
    }
}

#[async_trait]
impl SwapService for CountingTrader {
    async fn swap_native_for_token(
        &self,
        _chain: ChainKey,
        token_out: &str,
        amount_native: &str,
    ) -> Result<SwapResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(EngineError::ChainCall("rpc unreachable".into()));
        }
        Ok(SwapResult::DryRun {
            dry_run: true,
            id: "dry-run-loop-test".into(),
            token_in: None,
            token_out: token_out.into(),
            amount_in: amount_native.into(),
            min_out: "0".into(),
            quote_source: "router".into(),
        })
    }

    async fn swap_token_for_token(
        &self,
        _chain: ChainKey,
        token_in: &str,
        token_out: &str,
        amount_in: &str,
    ) -> Result<SwapResult, EngineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(SwapResult::DryRun {
            dry_run: true,
            id: "dry-run-loop-test".into(),
            token_in: Some(token_in.into()),
            token_out: token_out.into(),
            amount_in: amount_in.into(),
            min_out: "0".into(),
            quote_source: "router".into(),
        })
    }

    fn is_configured(&self) -> bool {
        true
    }
}

fn scheduler_with(
    trader: Arc<CountingTrader>,
    tick_secs: u64,
) -> (TradingScheduler, ActivityLog) {
    let activity = ActivityLog::new();
    let scheduler = TradingScheduler::new(
        Arc::new(FixedScanner(vec![
            Opportunity::placeholder("0xA", "Token A", "AAA", 3.2),
            Opportunity::placeholder("0xB", "Token B", "BBB", 1.8),
        ])),
        trader,
        Arc::new(ChainRegistry::new(ChainSettings::default())),
        activity.clone(),
        &TradingConfig {
            tick_secs,
            ..Default::default()
        },
    );
    (scheduler, activity)
}

#[tokio::test]
async fn first_tick_trades_the_best_token_and_logs_it() {
    let trader = Arc::new(CountingTrader::new(false));
    let (scheduler, activity) = scheduler_with(Arc::clone(&trader), 3600);

    scheduler.enable(TradePreferences::default()).await.unwrap();

    // The first interval tick fires immediately; give the task a moment.
    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.disable().await;

    assert_eq!(trader.calls.load(Ordering::SeqCst), 1);
    let recent = activity.recent(10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].action, ActivityAction::AutoTradeNative);
    assert_eq!(recent[0].details["token"], "0xA");
    assert_eq!(recent[0].details["amountIn"], "0.01");
}

#[tokio::test]
async fn failed_trades_surface_as_error_entries() {
    let trader = Arc::new(CountingTrader::new(true));
    let (scheduler, activity) = scheduler_with(trader, 3600);

    scheduler.enable(TradePreferences::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.disable().await;

    let recent = activity.recent(10);
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].action, ActivityAction::Error);
    assert!(recent[0].details["error"]
        .as_str()
        .unwrap()
        .contains("rpc unreachable"));
}

#[tokio::test]
async fn disable_stops_the_timer() {
    let trader = Arc::new(CountingTrader::new(false));
    let (scheduler, _activity) = scheduler_with(Arc::clone(&trader), 1);

    scheduler.enable(TradePreferences::default()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    scheduler.disable().await;

    let after_disable = trader.calls.load(Ordering::SeqCst);
    assert!(after_disable >= 1);

    // No further ticks fire once disabled.
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(trader.calls.load(Ordering::SeqCst), after_disable);
}
