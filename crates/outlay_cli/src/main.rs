//! Command-line entry point for the outlay expense sync server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use outlay_server::{ServerConfig, ServerResult, SyncServer};
use outlay_store::{ExpenseStore, StoreDir};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Expense sync server.
///
/// Stores one JSON expense file per bearer token under the data
/// directory and serves the sync, query and delete operations over
/// HTTP.
#[derive(Parser)]
#[command(name = "outlay")]
#[command(about = "Expense sync server", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Directory holding the per-token expense files
    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    /// Deadline in seconds for a single store operation
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(err) = run(cli).await {
        error!(error = %err, "server failed");
        std::process::exit(1);
    }
}

/// Provisions storage, then binds and serves until the process dies.
async fn run(cli: Cli) -> ServerResult<()> {
    let dir = StoreDir::create(&cli.data_dir)?;
    info!(path = %dir.path().display(), "storage directory ready");

    let store = Arc::new(ExpenseStore::new(dir));
    let config = ServerConfig::new(cli.bind)
        .with_request_timeout(Duration::from_secs(cli.request_timeout_secs));

    let server = SyncServer::bind(config, store).await?;
    server.serve().await
}
