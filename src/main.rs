use std::sync::Arc;

use clap::Parser;
use quizhive_engine::SessionStore;
use quizhive_server::ServerConfig;
use quizhive_telemetry::{init_telemetry, TelemetryConfig};

#[derive(Parser, Debug)]
#[command(name = "quizhive", version, about = "Multiplayer live-quiz server")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Outbound frames buffered per connection before drops.
    #[arg(long, default_value_t = 256)]
    max_send_queue: usize,

    /// Default log level. Overridden by RUST_LOG.
    #[arg(long, default_value = "info")]
    log_level: tracing::Level,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    init_telemetry(&TelemetryConfig {
        log_level: cli.log_level,
        module_levels: Vec::new(),
        json_output: cli.json_logs,
    });

    tracing::info!("Starting quizhive server");

    // All game state lives here for the lifetime of the process.
    let store = Arc::new(SessionStore::new());

    let config = ServerConfig {
        port: cli.port,
        max_send_queue: cli.max_send_queue,
    };
    let handle = quizhive_server::start(config, store)
        .await
        .expect("Failed to start server");

    tracing::info!(port = handle.port, "quizhive server ready");

    // Wait for shutdown signal
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl+c");

    tracing::info!("Shutting down");
}
