//! `feeindex-node` — process wiring for the fee indexer.
//!
//! Parses CLI flags, builds the RPC transport, persistence, stats store,
//! aggregation engine, and subscription hub, runs the sync orchestrator's
//! startup sequence, then serves the websocket hub while live-tailing new
//! blocks.

#![deny(unused_must_use, rust_2018_idioms)]

use clap::Parser;
use feeindex_constants::NetworkConstants;
use feeindex_hub::{Hub, HubState, PriceWatcher};
use feeindex_indexer::{AggregationEngine, BlockProcessor, StatsStore, SyncOrchestrator, SyncOrchestratorConfig};
use feeindex_persist::SqliteRepository;
use feeindex_rpc::{HeadSubscription, ReceiptWorkerPool, UpstreamClient};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Bounded ring size for the most-recent-blocks list served by
/// `internal_getInitialData`.
const LATEST_BLOCKS_RING_CAPACITY: usize = 300;

/// Real-time indexing and fan-out service for Ethereum post-EIP-1559 fee
/// economics.
#[derive(Parser, Debug)]
#[command(name = "feeindex-node", version, about)]
struct Cli {
    /// HTTP/websocket listen address for the subscription hub.
    #[arg(long, default_value = "0.0.0.0:8080", env = "FEEINDEX_ADDR")]
    addr: String,

    /// HTTP endpoint of the upstream Ethereum node.
    #[arg(long, env = "FEEINDEX_GETH_ENDPOINT_HTTP")]
    geth_endpoint_http: String,

    /// Websocket endpoint of the upstream Ethereum node, used for the
    /// `newHeads` subscription.
    #[arg(long, env = "FEEINDEX_GETH_ENDPOINT_WEBSOCKET")]
    geth_endpoint_websocket: String,

    /// SQLite connection string (e.g. `sqlite://feeindex.db`).
    #[arg(long, default_value = "sqlite://feeindex.db", env = "FEEINDEX_DB_PATH")]
    db_path: String,

    /// Use Ropsten testnet era thresholds instead of mainnet's.
    #[arg(long)]
    ropsten: bool,

    /// Number of concurrent workers fetching transaction receipts per
    /// block.
    #[arg(long, default_value_t = 10)]
    worker_count: usize,

    /// Enable verbose debug logging (shorthand for `--log-level debug`).
    #[arg(long)]
    debug: bool,

    /// Enable development mode (pretty-printed, non-JSON logs by default).
    #[arg(long)]
    development: bool,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Default log level when `RUST_LOG` is unset.
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum LogFormat {
    /// Human-readable, multi-line output.
    Pretty,
    /// Newline-delimited JSON, suited to log aggregation.
    Json,
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.debug { "debug" } else { cli.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match cli.log_format {
        LogFormat::Json if !cli.development => {
            builder.json().try_init().ok();
        }
        _ => {
            builder.pretty().try_init().ok();
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let network = if cli.ropsten { NetworkConstants::ropsten() } else { NetworkConstants::mainnet() };

    let http_url: url::Url = cli.geth_endpoint_http.parse()?;
    let ws_url: url::Url = cli.geth_endpoint_websocket.parse()?;

    let rpc = UpstreamClient::new(http_url);
    let receipts = ReceiptWorkerPool::new(rpc.clone(), cli.worker_count);
    let processor = BlockProcessor::new(rpc.clone(), receipts, network);

    let store = Arc::new(StatsStore::new(LATEST_BLOCKS_RING_CAPACITY));
    let aggregation = Arc::new(AggregationEngine::new(store.clone(), network));
    let repository = Arc::new(SqliteRepository::connect(&cli.db_path).await?);

    let (blocks_tx, _blocks_rx) = broadcast::channel(1024);

    let orchestrator = SyncOrchestrator::new(
        rpc,
        processor,
        store.clone(),
        aggregation.clone(),
        repository.clone(),
        network,
        SyncOrchestratorConfig::default(),
        blocks_tx.clone(),
    );

    info!("running startup sequence: wait-for-sync, catch-up, gap-fill, rebuild");
    orchestrator.startup().await?;
    info!(blocks = store.stats_len(), "startup sequence complete, entering live mode");

    let price = Arc::new(PriceWatcher::new());
    tokio::spawn({
        let price = price.clone();
        async move { price.run().await }
    });

    let hub_state = HubState {
        hub: Arc::new(Hub::new()),
        store,
        aggregation,
        repository,
        price,
        blocks: blocks_tx,
        version: Arc::from(env!("CARGO_PKG_VERSION")),
    };
    let router = feeindex_hub::router(hub_state);

    let listener = tokio::net::TcpListener::bind(&cli.addr).await?;
    info!(addr = %cli.addr, "serving subscription hub");

    let head_subscription = HeadSubscription::new(ws_url);
    let live_loop = tokio::spawn(async move { orchestrator.run_live(head_subscription).await });

    tokio::select! {
        result = axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()) => {
            result?;
        }
        _ = live_loop => {
            tracing::error!("live-tailing loop exited unexpectedly");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
