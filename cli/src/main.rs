//! centive — run the chain event indexer.
//!
//! Usage:
//! ```bash
//! centive run ./centive.json
//! centive info
//! centive version
//! ```

use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use centive_core::{BlockProcessor, IndexerConfig, ScanDriver, TokioClock};
use centive_evm::{run_scan_schedule, EvmEventSource, HttpRpcClient, RpcClient, TokioJobRunner};
use centive_storage::sqlite::SqliteIndexStore;

/// Settings file shape (`centive.json`).
#[derive(Debug, Deserialize)]
struct Settings {
    /// JSON-RPC endpoint of the chain node.
    web3_url: String,
    /// Address of the campaign contract.
    contract_address: String,
    /// SQLite database path.
    #[serde(default = "default_database")]
    database: String,
    /// Indexer policy knobs.
    #[serde(default)]
    indexer: IndexerConfig,
    /// Tracing filter directive, e.g. `"info"` or `"info,centive_core=debug"`.
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_database() -> String {
    "./centive.db".into()
}

fn default_log_level() -> String {
    "info".into()
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    match args[1].as_str() {
        "run" => {
            let path = args.get(2).map(String::as_str).unwrap_or("centive.json");
            cmd_run(path).await
        }
        "info" => {
            cmd_info();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("centive {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    }
}

fn print_usage() {
    println!("centive {}", env!("CARGO_PKG_VERSION"));
    println!("Chain event indexer for the campaign contract\n");
    println!("USAGE:");
    println!("    centive <COMMAND>\n");
    println!("COMMANDS:");
    println!("    run [config]  Run the indexer (default config: ./centive.json)");
    println!("    info          Show default policy values");
    println!("    version       Print version");
    println!("    help          Print this help");
}

fn cmd_info() {
    let defaults = IndexerConfig::default();
    println!("Centive v{}", env!("CARGO_PKG_VERSION"));
    println!("  Confirmation depth: {} blocks", defaults.confirmation_depth);
    println!("  Max batch size: {} blocks", defaults.max_batch_size);
    println!("  Scan interval: every {} min", defaults.scan_interval_minutes);
    println!("  Ticks per scan: {}", defaults.ticks_per_run);
    println!("  Block time: {} ms", defaults.block_time_ms);
    println!("  Storage backends: memory, SQLite (feature: sqlite)");
}

fn init_tracing(directives: &str) {
    let filter = EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn cmd_run(config_path: &str) -> Result<()> {
    let raw = std::fs::read_to_string(config_path)
        .with_context(|| format!("reading config file {config_path}"))?;
    let settings: Settings =
        serde_json::from_str(&raw).with_context(|| format!("parsing {config_path}"))?;

    init_tracing(&settings.log_level);
    tracing::info!(
        contract = %settings.contract_address,
        database = %settings.database,
        start_block = settings.indexer.start_block,
        "starting indexer"
    );

    let store = Arc::new(
        SqliteIndexStore::open(&settings.database)
            .await
            .context("opening index store")?,
    );
    store
        .initialize_watermark(settings.indexer.start_block)
        .await
        .context("seeding watermark")?;

    let client: Arc<dyn RpcClient> =
        Arc::new(HttpRpcClient::new(&settings.web3_url).context("building RPC client")?);
    let source = Arc::new(EvmEventSource::new(client, &settings.contract_address));

    let processor = Arc::new(BlockProcessor::new(
        source.clone(),
        store.clone(),
        store.clone(),
    ));
    let runner = Arc::new(TokioJobRunner::new(processor));
    let driver = Arc::new(ScanDriver::new(
        &settings.indexer,
        source,
        store,
        runner,
        Arc::new(TokioClock),
    ));

    tokio::select! {
        _ = run_scan_schedule(driver, settings.indexer.scan_interval()) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }
    Ok(())
}
