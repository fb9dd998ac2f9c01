//! Fetcher Binary - Market Snapshot Poller
//!
//! Polls the market-data provider for every tracked symbol and rewrites the
//! JSON snapshot read by the dashboard.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin fetcher            # loop until Ctrl+C
//! cargo run --release --bin fetcher -- --once  # single cycle, then exit
//! ```
//!
//! ## Environment Variables
//!
//! - SNAPSHOT_PATH - Snapshot output file (default: ./resources/data/crypto-prices.json)
//! - UPDATE_INTERVAL_SECS - Seconds between cycles (default: 10)
//! - MARKET_DATA_BASE_URL - Provider base URL (default: https://query1.finance.yahoo.com)
//! - TRACKED_SYMBOLS - Comma separated `TICKER:Name` pairs (default: BTC, ETH, XRP, SOL, DOGE, ADA)
//! - LEAD_SYMBOL - Symbol whose market-cap share is reported as dominance (default: BTC)
//! - HTTP_TIMEOUT_SECS - Per-request timeout (default: 10)
//! - SPARKLINE_POINTS - Closes kept per symbol (default: 20)
//! - RUST_LOG - Logging level (optional, default: info)

use cryptoflow::config::FetcherConfig;
use cryptoflow::market::YahooFinanceProvider;
use cryptoflow::refresh::{run_cycle, RefreshLoop, RefreshSettings};
use cryptoflow::snapshot::JsonFileSink;
use std::env;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let once = env::args().any(|arg| arg == "--once");
    let config = FetcherConfig::from_env();

    log::info!("🚀 Starting crypto snapshot fetcher");
    log::info!("   Snapshot: {}", config.snapshot_path.display());
    log::info!("   Symbols: {}", config.symbols.len());
    log::info!("   Interval: {}s", config.update_interval_secs);
    log::info!("   Provider: {}", config.market_data_base_url);

    let provider = Arc::new(YahooFinanceProvider::new(
        &config.market_data_base_url,
        config.http_timeout(),
    )?);
    let sink = Arc::new(JsonFileSink::new(config.snapshot_path.clone()));
    let settings = RefreshSettings::from_config(&config);

    if once {
        let snapshot = run_cycle(provider.as_ref(), sink.as_ref(), &settings).await?;
        log::info!(
            "✅ Wrote {} records to {}",
            snapshot.cryptocurrencies.len(),
            config.snapshot_path.display()
        );
        return Ok(());
    }

    let mut refresh = RefreshLoop::new(provider, sink, settings);
    refresh.start();

    log::info!("Press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    log::info!("🛑 Received Ctrl+C, stopping");

    let cycles = refresh.stop().await;
    log::info!("✅ Fetcher stopped after {} cycles", cycles);

    Ok(())
}
