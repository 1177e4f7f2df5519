//! Burrow Liquidation Agent
//!
//! Automated liquidator for the Burrowland lending protocol on NEAR:
//! - Snapshot-driven evaluation passes on a fixed interval, never overlapping
//! - Volatility-weighted account risk model with discount-aware sizing
//! - Margin-position liquidation routed through Ref Finance pools
//! - Dual oracle support (priceoracle pull mode, Pyth push mode)

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use burrow_chain::{BurrowClient, DryRunSubmitter, OracleClient, RefExchangeClient, RpcClient};
use burrow_core::{BotConfig, Engine};
use burrow_dex::TokenDecimalsCache;

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,burrow_core=debug,burrow_chain=debug")),
        )
        .init();

    // Load bot config (BOT_PROFILE selects a TOML profile, env overrides apply)
    let config = BotConfig::from_env();
    config.log_config();

    info!("Starting Burrow Liquidation Agent");

    let engine = initialize_components(config).await?;

    // Shutdown on ctrl-c via a watch channel; the engine finishes the
    // in-flight pass before exiting.
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received");
            let _ = shutdown_tx.send(true);
        }
    });

    info!("Starting evaluation loop...");
    engine.run(shutdown_rx).await?;

    Ok(())
}

async fn initialize_components(config: BotConfig) -> Result<Engine> {
    info!("Initializing components...");

    let rpc = RpcClient::new(config.network.rpc_url.clone());
    let height = rpc.block_height().await?;
    info!(height, rpc = %rpc.url(), "RPC connection verified");

    let burrow = Arc::new(BurrowClient::new(
        rpc.clone(),
        config.network.burrow_contract_id.clone(),
    ));
    info!(contract = %burrow.contract_id(), "lending contract client ready");

    let oracle = Arc::new(OracleClient::new(
        rpc.clone(),
        config.network.price_oracle_contract_id.clone(),
        config.network.pyth_oracle_contract_id.clone(),
        config.network.burrow_contract_id.clone(),
    ));

    let exchange = Arc::new(RefExchangeClient::new(
        rpc,
        config.network.ref_exchange_contract_id.clone(),
    ));
    info!(contract = %exchange.contract_id(), "exchange client ready");

    // The decimals cache is the only state shared across passes.
    let decimals_cache = Arc::new(TokenDecimalsCache::new());
    decimals_cache.seed(&config.network.wrap_token_id, 24);

    // Submission stays behind the TxSubmitter seam; the bundled submitter
    // logs payloads instead of broadcasting (wire signing is external).
    let submitter = Arc::new(DryRunSubmitter);

    let engine = Engine::new(
        burrow.clone(),
        burrow,
        oracle,
        exchange.clone(),
        submitter,
        exchange,
        decimals_cache,
        config,
    );

    info!("All components initialized");
    Ok(engine)
}

/// Print startup banner.
fn print_banner() {
    println!(
        r#"
    ╔╗ ┬ ┬┬─┐┬─┐┌─┐┬ ┬  ╦  ┬┌─┐ ┬ ┬┬┌┬┐┌─┐┌┬┐┌─┐┬─┐
    ╠╩╗│ │├┬┘├┬┘│ ││││  ║  ││─┼┐│ ││ ││├─┤ │ │ │├┬┘
    ╚═╝└─┘┴└─┴└─└─┘└┴┘  ╩═╝┴└─┘└└─┘┴─┴┘┴ ┴ ┴ └─┘┴└─
    Liquidation Agent v0.1.0
    "#
    );
}
