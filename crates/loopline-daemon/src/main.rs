//! loopline-daemon: the royalty engine service.
//!
//! Single OS process running a Tokio async runtime. Clients talk to the
//! daemon via newline-delimited JSON-RPC over a Unix socket.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;

use loopline_royalty::metering::Meter;
use loopline_royalty::pricing::UsageCalculator;
use loopline_royalty::SqliteStore;
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Database file name inside the data directory.
const DB_FILE: &str = "loopline.db";

/// Socket file name inside the data directory.
const SOCKET_FILE: &str = "loopline.sock";

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: Arc<tokio::sync::Mutex<rusqlite::Connection>>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Usage pricing, validated at startup.
    pub calculator: UsageCalculator,
    /// Pass accounting, validated at startup.
    pub meter: Meter,
    /// Shutdown signal sender.
    pub shutdown_tx: broadcast::Sender<()>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load config
    let config = DaemonConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("loopline={}", config.advanced.log_level).parse()?),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "Loopline daemon starting");

    // 2. Validate engine configuration once
    let calculator = UsageCalculator::new(config.pricing.clone())?;
    let meter = Meter::new(config.metering.clone())?;

    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 3. Open database
    let conn = loopline_db::open(&data_dir.join(DB_FILE))?;
    let expired = meter.refresh_expired(&SqliteStore::new(&conn), commands::unix_now())?;
    info!(expired, "startup housekeeping done");
    let db = Arc::new(tokio::sync::Mutex::new(conn));

    // 4. Create shutdown channel
    let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);

    // 5. Build daemon state
    let state = Arc::new(DaemonState {
        db,
        config,
        calculator,
        meter,
        shutdown_tx: shutdown_tx.clone(),
    });

    // 6. Start IPC server
    let socket_path = data_dir.join(SOCKET_FILE);
    let rpc_server = RpcServer::new(state.clone(), socket_path.clone());

    // 7. Run the RPC server until shutdown
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        result = rpc_server.run() => {
            if let Err(e) = result {
                error!("RPC server error: {}", e);
            }
        }
        _ = shutdown_rx.recv() => {
            info!("Shutdown signal received");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl-C received, shutting down");
        }
    }

    // Clean up socket file
    let _ = std::fs::remove_file(&socket_path);

    info!("Daemon stopped");
    Ok(())
}
