//! Analyze Binary - Offline Snapshot Analysis
//!
//! Reads the latest snapshot, fits volatility and price-change regressions,
//! and writes correlations, insights and model metrics as one JSON report.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin analyze
//! ```
//!
//! ## Environment Variables
//!
//! - SNAPSHOT_PATH - Snapshot to read (default: ./resources/data/crypto-prices.json)
//! - ANALYSIS_REPORT_PATH - Report output (default: ./resources/data/ml-analysis-results.json)
//! - ANALYSIS_SEED - Seed for the split and the forest (default: 42)
//! - ANALYSIS_TREES - Trees per forest (default: 100)
//! - ANALYSIS_TEST_FRACTION - Share of rows held out for testing (default: 0.3)
//! - ANALYSIS_CV_FOLDS - Cross-validation folds (default: 5)
//! - RUST_LOG - Logging level (optional, default: info)

use cryptoflow::analysis::run_analysis;
use cryptoflow::config::AnalysisConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    dotenv::dotenv().ok();

    let config = AnalysisConfig::from_env();
    log::info!("   Seed: {}, trees: {}", config.seed, config.n_trees);

    let report = run_analysis(&config)?;

    log::info!(
        "📊 Volatility R²={:.4}, price change R²={:.4}",
        report.ml_metrics.volatility_r2,
        report.ml_metrics.price_r2
    );
    for row in &report.insights.top_sentiment {
        log::info!("   Top sentiment: {} ({:.2})", row.symbol, row.sentiment);
    }

    Ok(())
}
