//! Dashboard Binary - Fetcher + Static Server Launcher
//!
//! Starts the `fetcher` binary, waits for the first snapshot, then serves the
//! dashboard with a static file server until Ctrl+C.
//!
//! ## Usage
//!
//! ```bash
//! cargo build --release && cargo run --release --bin dashboard
//! ```
//!
//! ## Environment Variables
//!
//! - SNAPSHOT_PATH - Snapshot the fetcher must produce (default: ./resources/data/crypto-prices.json)
//! - FETCHER_BIN - Fetcher executable (default: `fetcher` next to this binary)
//! - DASHBOARD_SERVER_CMD - Static server command line (default: python3 -m http.server 8000)
//! - DASHBOARD_STARTUP_WAIT_SECS - Wait before checking for the snapshot (default: 5)
//! - DASHBOARD_URL - URL printed once the server is up (default: http://localhost:8000)
//! - RUST_LOG - Logging level (optional, default: info)

use cryptoflow::config::LauncherConfig;
use cryptoflow::launcher::launch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = LauncherConfig::from_env();

    log::info!("🚀 Starting crypto dashboard");
    log::info!("   Fetcher: {}", config.fetcher_bin.display());
    log::info!("   Snapshot: {}", config.snapshot_path.display());

    let shutdown = launch(&config).await?;
    log::debug!("Launcher ended: {:?}", shutdown);

    Ok(())
}
