//! AUTOTRADER — Autonomous Multi-Chain Token Trading Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! wires the scan→quote→swap pipeline behind the HTTP API, and runs
//! until a shutdown signal arrives.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use autotrader::chain::client::{ChainClient, RpcChainClient};
use autotrader::chain::ChainRegistry;
use autotrader::config::AppConfig;
use autotrader::data::dexscreener::DexScreenerClient;
use autotrader::engine::activity::ActivityLog;
use autotrader::engine::executor::SwapExecutor;
use autotrader::engine::quote::{QuoteEngine, Quoter};
use autotrader::engine::scanner::OpportunityScanner;
use autotrader::engine::scheduler::TradingScheduler;
use autotrader::engine::{OpportunitySource, SwapService};
use autotrader::server;
use autotrader::server::routes::EngineState;

const BANNER: &str = r#"
   _   _   _ _____ ___ _____ ____      _    ____  _____ ____
  / \ | | | |_   _/ _ \_   _|  _ \    / \  |  _ \| ____|  _ \
 / _ \| | | | | || | | || | | |_) |  / _ \ | | | |  _| | |_) |
/ ___ \ |_| | | || |_| || | |  _ <  / ___ \| |_| | |___|  _ <
/_/  \_\___/  |_| \___/ |_| |_| \_\/_/   \_\____/|_____|_| \_\

  Autonomous Multi-Chain Token Trading Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration: TOML file plus environment overlay
    let cfg = AppConfig::load("config.toml")?;

    init_logging();

    println!("{BANNER}");
    let dry_run = cfg.effective_dry_run();
    info!(
        port = cfg.server.port,
        tick_secs = cfg.trading.tick_secs,
        slippage_bps = cfg.trading.slippage_bps,
        dry_run,
        "AUTOTRADER starting up"
    );

    // -- Wire components ---------------------------------------------------

    let registry = Arc::new(ChainRegistry::new(cfg.chains.clone()));
    let feed = Arc::new(DexScreenerClient::new(Duration::from_secs(
        cfg.scanner.query_timeout_secs,
    ))?);

    let client: Arc<dyn ChainClient> =
        Arc::new(RpcChainClient::from_raw_key(cfg.expose_signing_key()));
    let quoter: Arc<dyn Quoter> =
        Arc::new(QuoteEngine::new(Arc::clone(&client), Arc::clone(&feed)));

    let scanner: Arc<dyn OpportunitySource> =
        Arc::new(OpportunityScanner::new(Arc::clone(&feed)));
    let trader: Arc<dyn SwapService> = Arc::new(SwapExecutor::new(
        Arc::clone(&registry),
        Arc::clone(&client),
        quoter,
        &cfg.trading,
        dry_run,
    ));

    let activity = ActivityLog::new();
    let scheduler = TradingScheduler::new(
        Arc::clone(&scanner),
        Arc::clone(&trader),
        Arc::clone(&registry),
        activity.clone(),
        &cfg.trading,
    );

    let state = Arc::new(EngineState {
        scheduler,
        scanner,
        trader,
        registry,
        activity,
    });

    // -- Serve ---------------------------------------------------------------

    server::spawn_server(Arc::clone(&state), cfg.server.port)?;
    info!("Ready. Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received.");
    state.scheduler.disable().await;
    info!("AUTOTRADER shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("autotrader=info"));

    let json_logging = std::env::var("AUTOTRADER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt().with_env_filter(env_filter).with_target(true).init();
    }
}
