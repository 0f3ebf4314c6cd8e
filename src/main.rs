//! echo-reactor: a single-threaded TCP line echo server
//!
//! Features:
//! - Readiness-driven reactor (epoll on Linux, kqueue on macOS)
//! - Newline-delimited echo with `bye` to end a session
//! - Per-connection buffer caps to disconnect slow consumers
//! - Configuration via CLI arguments or TOML file

use echo_reactor::config::Config;
use echo_reactor::runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        host = %config.host,
        port = config.port,
        max_connections = config.max_connections,
        max_buffer_size = config.max_buffer_size,
        "Starting echo-reactor server"
    );

    runtime::run(&config)?;

    info!("Server stopped");
    Ok(())
}
