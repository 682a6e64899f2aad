//! Scribe - CometBFT range indexer.
//!
//! # Usage
//!
//! ```bash
//! # Index blocks 1..latest with the default actions
//! scribe
//!
//! # Index a specific range with more workers
//! DATABASE_URL=postgres://localhost/scribe RPC_URL=http://localhost:26657 \
//!     scribe --begin-block 2578000 --end-block 2579000 --concurrent-blocks 50
//! ```

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use scribe_actions::builtin_registry;
use scribe_cometbft::{CometClient, CometClientConfig};
use scribe_core::error::IndexerError;
use scribe_core::metrics::init_metrics;
use scribe_core::ports::ChainClient;
use scribe_core::services::{Indexer, IndexerConfig};
use scribe_storage::{Database, DatabaseConfig};

/// Scribe CLI - CometBFT range indexer.
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(about = "Scribe - index a range of CometBFT blocks into PostgreSQL")]
#[command(version)]
struct Cli {
    /// CometBFT node RPC URL.
    #[arg(long, env = "RPC_URL", default_value = "http://127.0.0.1:26657")]
    rpc_url: String,

    /// PostgreSQL database URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost/scribe"
    )]
    database_url: String,

    /// Block height to start indexing from.
    #[arg(long, short = 's', default_value = "1")]
    begin_block: u64,

    /// Block height to end indexing at (exclusive). 0 uses the node's
    /// latest height.
    #[arg(long, short = 'e', default_value = "0")]
    end_block: u64,

    /// How many blocks to process concurrently.
    #[arg(long, short = 'b', default_value = "100")]
    concurrent_blocks: usize,

    /// Comma-separated names of the block actions to run.
    #[arg(
        long,
        env = "ACTIONS",
        value_delimiter = ',',
        default_value = "ics20_transfers"
    )]
    actions: Vec<String>,

    /// Maximum retry passes over heights whose fetch keeps failing.
    /// 0 retries forever.
    #[arg(long, default_value = "10")]
    max_passes: u32,

    /// Prometheus metrics port. 0 disables the exporter.
    #[arg(long, env = "METRICS_PORT", default_value = "9090")]
    metrics_port: u16,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.json_logs);

    if cli.concurrent_blocks < 1 {
        bail!(
            "invalid flag value {}, value of --concurrent-blocks must be greater than or equal to 1",
            cli.concurrent_blocks
        );
    }

    init_metrics_exporter(cli.metrics_port);

    // ─────────────────────────────────────────────────────────────────────────
    // 🚀 STARTUP
    // ─────────────────────────────────────────────────────────────────────────
    info!("🚀 Starting Scribe indexer");
    debug!(rpc_url = %cli.rpc_url, "Chain endpoint");
    debug!(database_url = %mask_password(&cli.database_url), "Database endpoint");

    // ─────────────────────────────────────────────────────────────────────────
    // 🗄️ DATABASE
    // ─────────────────────────────────────────────────────────────────────────
    info!("🗄️  Connecting to database...");
    let db = Database::connect(&DatabaseConfig::for_indexer(&cli.database_url))
        .await
        .context("Failed to connect to database")?;
    info!("🗄️  Database ready");

    // ─────────────────────────────────────────────────────────────────────────
    // 📡 CHAIN CONNECTION
    // ─────────────────────────────────────────────────────────────────────────
    info!("📡 Connecting to CometBFT node...");
    let chain = CometClient::connect(CometClientConfig {
        rpc_url: cli.rpc_url.clone(),
        ..Default::default()
    })
    .await
    .context("Failed to connect to CometBFT node")?;
    let chain = Arc::new(chain);

    let latest = chain.latest_height().await?;
    info!(
        chain_id = chain.chain_id(),
        head = latest,
        "🔗 Chain connected"
    );

    // ─────────────────────────────────────────────────────────────────────────
    // 📦 BLOCK ACTIONS
    // ─────────────────────────────────────────────────────────────────────────
    let registry = builtin_registry(db.pool().clone())?;
    let actions = registry.resolve(&cli.actions)?;
    info!(actions = ?cli.actions, "📦 Block actions resolved");

    // If no end block is specified, use the latest block height.
    let end_block = if cli.end_block == 0 {
        latest
    } else {
        cli.end_block
    };
    let heights: Vec<u64> = (cli.begin_block..end_block).collect();
    if heights.is_empty() {
        warn!(
            begin = cli.begin_block,
            end = end_block,
            "Empty block range, nothing to index"
        );
    }

    let indexer_config = IndexerConfig {
        max_passes: (cli.max_passes > 0).then_some(cli.max_passes),
        ..Default::default()
    };
    let indexer = Indexer::new(indexer_config, chain, actions);

    // ─────────────────────────────────────────────────────────────────────────
    // ⚡ RUN
    // ─────────────────────────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("🛑 Shutdown requested...");
        let _ = shutdown_tx.send(true);
    });

    info!(
        begin = cli.begin_block,
        end = end_block,
        blocks = heights.len(),
        concurrency = cli.concurrent_blocks,
        "⚡ Indexing range"
    );

    let result = indexer
        .run(heights, cli.concurrent_blocks, shutdown_rx)
        .await;

    db.close().await;

    match result {
        Ok(()) => {
            info!("✅ Run complete");
            Ok(())
        }
        Err(IndexerError::ShutdownRequested) => {
            info!("🛑 Shutdown complete");
            Ok(())
        }
        Err(err) => Err(err).context("Indexer run failed"),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .init();
    }
}

/// Prometheus metrics exporter (optional - failures don't crash the app).
fn init_metrics_exporter(port: u16) {
    if port == 0 {
        info!("📊 Metrics disabled");
        return;
    }

    match format!("0.0.0.0:{port}").parse::<std::net::SocketAddr>() {
        Ok(addr) => match PrometheusBuilder::new().with_http_listener(addr).install() {
            Ok(()) => {
                init_metrics();
                info!("📊 Metrics: http://localhost:{port}/metrics");
            }
            Err(e) => {
                warn!("⚠️  Failed to start metrics exporter: {e}. Continuing without metrics.");
            }
        },
        Err(e) => {
            warn!("⚠️  Invalid metrics address: {e}. Continuing without metrics.");
        }
    }
}

/// Mask password in database URL for logging.
fn mask_password(url_str: &str) -> String {
    match url::Url::parse(url_str) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => url_str.to_string(),
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
