//! Configuration from environment variables
//!
//! Every binary loads `.env` first (see `dotenv`) and then reads its config
//! struct through `from_env()`. Unset or unparsable values fall back to the
//! defaults documented on each loader.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default snapshot location, shared by the fetcher, the analysis job and the launcher.
pub const DEFAULT_SNAPSHOT_PATH: &str = "./resources/data/crypto-prices.json";

/// Symbols tracked when `TRACKED_SYMBOLS` is not set.
const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("BTC-USD", "Bitcoin"),
    ("ETH-USD", "Ethereum"),
    ("XRP-USD", "Ripple"),
    ("SOL-USD", "Solana"),
    ("DOGE-USD", "Dogecoin"),
    ("ADA-USD", "Cardano"),
];

/// A ticker understood by the market-data provider plus its display name.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedSymbol {
    pub ticker: String,
    pub name: String,
}

impl TrackedSymbol {
    pub fn new(ticker: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            name: name.into(),
        }
    }

    /// Short symbol written to the snapshot (`BTC-USD` -> `BTC`).
    pub fn symbol(&self) -> String {
        self.ticker.trim_end_matches("-USD").to_string()
    }
}

/// Configuration for the live fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Destination of the JSON snapshot
    pub snapshot_path: PathBuf,

    /// Seconds between refresh cycles
    pub update_interval_secs: u64,

    /// Base URL of the market-data provider
    pub market_data_base_url: String,

    /// Ticker -> display name, in output order
    pub symbols: Vec<TrackedSymbol>,

    /// Symbol used for the dominance ratio
    pub lead_symbol: String,

    /// Per-request timeout for provider calls
    pub http_timeout_secs: u64,

    /// Maximum number of closes embedded in each record
    pub sparkline_points: usize,
}

impl FetcherConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SNAPSHOT_PATH` (default: ./resources/data/crypto-prices.json)
    /// - `UPDATE_INTERVAL_SECS` (default: 10)
    /// - `MARKET_DATA_BASE_URL` (default: https://query1.finance.yahoo.com)
    /// - `TRACKED_SYMBOLS` (default: BTC, ETH, XRP, SOL, DOGE, ADA)
    /// - `LEAD_SYMBOL` (default: BTC)
    /// - `HTTP_TIMEOUT_SECS` (default: 10)
    /// - `SPARKLINE_POINTS` (default: 20)
    pub fn from_env() -> Self {
        Self {
            snapshot_path: snapshot_path_from_env(),

            update_interval_secs: parse_env("UPDATE_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(10),

            market_data_base_url: env::var("MARKET_DATA_BASE_URL")
                .unwrap_or_else(|_| "https://query1.finance.yahoo.com".to_string()),

            symbols: env::var("TRACKED_SYMBOLS")
                .ok()
                .map(|s| parse_symbol_list(&s))
                .filter(|symbols| !symbols.is_empty())
                .unwrap_or_else(default_symbols),

            lead_symbol: env::var("LEAD_SYMBOL").unwrap_or_else(|_| "BTC".to_string()),

            http_timeout_secs: parse_env("HTTP_TIMEOUT_SECS")
                .filter(|secs: &u64| *secs > 0)
                .unwrap_or(10),

            sparkline_points: parse_env("SPARKLINE_POINTS")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(20),
        }
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Configuration for the offline analysis job.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub snapshot_path: PathBuf,
    pub report_path: PathBuf,
    pub seed: u64,
    pub n_trees: usize,
    pub test_fraction: f64,
    pub cv_folds: usize,
}

impl AnalysisConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SNAPSHOT_PATH` (default: ./resources/data/crypto-prices.json)
    /// - `ANALYSIS_REPORT_PATH` (default: ./resources/data/ml-analysis-results.json)
    /// - `ANALYSIS_SEED` (default: 42)
    /// - `ANALYSIS_TREES` (default: 100)
    /// - `ANALYSIS_TEST_FRACTION` (default: 0.3)
    /// - `ANALYSIS_CV_FOLDS` (default: 5)
    pub fn from_env() -> Self {
        Self {
            snapshot_path: snapshot_path_from_env(),
            report_path: env::var("ANALYSIS_REPORT_PATH")
                .unwrap_or_else(|_| "./resources/data/ml-analysis-results.json".to_string())
                .into(),
            seed: parse_env("ANALYSIS_SEED").unwrap_or(42),
            n_trees: parse_env("ANALYSIS_TREES")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(100),
            test_fraction: parse_env("ANALYSIS_TEST_FRACTION")
                .filter(|f: &f64| *f > 0.0 && *f < 1.0)
                .unwrap_or(0.3),
            cv_folds: parse_env("ANALYSIS_CV_FOLDS")
                .filter(|k: &usize| *k >= 2)
                .unwrap_or(5),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            snapshot_path: DEFAULT_SNAPSHOT_PATH.into(),
            report_path: "./resources/data/ml-analysis-results.json".into(),
            seed: 42,
            n_trees: 100,
            test_fraction: 0.3,
            cv_folds: 5,
        }
    }
}

/// Configuration for the dashboard launcher.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub snapshot_path: PathBuf,
    pub fetcher_bin: PathBuf,
    /// Program followed by its arguments
    pub server_command: Vec<String>,
    pub startup_wait_secs: u64,
    pub dashboard_url: String,
}

impl LauncherConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `SNAPSHOT_PATH` (default: ./resources/data/crypto-prices.json)
    /// - `FETCHER_BIN` (default: `fetcher` next to the running executable)
    /// - `DASHBOARD_SERVER_CMD` (default: python3 -m http.server 8000)
    /// - `DASHBOARD_STARTUP_WAIT_SECS` (default: 5)
    /// - `DASHBOARD_URL` (default: http://localhost:8000)
    pub fn from_env() -> Self {
        let server_command = env::var("DASHBOARD_SERVER_CMD")
            .ok()
            .map(|s| s.split_whitespace().map(str::to_string).collect::<Vec<_>>())
            .filter(|parts| !parts.is_empty())
            .unwrap_or_else(|| {
                ["python3", "-m", "http.server", "8000"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Self {
            snapshot_path: snapshot_path_from_env(),
            fetcher_bin: env::var("FETCHER_BIN")
                .map(PathBuf::from)
                .unwrap_or_else(|_| sibling_binary("fetcher")),
            server_command,
            startup_wait_secs: parse_env("DASHBOARD_STARTUP_WAIT_SECS").unwrap_or(5),
            dashboard_url: env::var("DASHBOARD_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
        }
    }

    pub fn startup_wait(&self) -> Duration {
        Duration::from_secs(self.startup_wait_secs)
    }
}

/// Parse `TICKER:Name` pairs separated by commas. A bare ticker uses itself as the name.
pub fn parse_symbol_list(raw: &str) -> Vec<TrackedSymbol> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((ticker, name)) => TrackedSymbol::new(ticker.trim(), name.trim()),
            None => TrackedSymbol::new(entry, entry),
        })
        .collect()
}

pub fn default_symbols() -> Vec<TrackedSymbol> {
    DEFAULT_SYMBOLS
        .iter()
        .map(|(ticker, name)| TrackedSymbol::new(*ticker, *name))
        .collect()
}

fn snapshot_path_from_env() -> PathBuf {
    env::var("SNAPSHOT_PATH")
        .unwrap_or_else(|_| DEFAULT_SNAPSHOT_PATH.to_string())
        .into()
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn sibling_binary(name: &str) -> PathBuf {
    let file_name = format!("{}{}", name, env::consts::EXE_SUFFIX);
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_and_custom_fetcher_config() {
        // Env vars are process-global, so both cases run in one test
        env::remove_var("SNAPSHOT_PATH");
        env::remove_var("UPDATE_INTERVAL_SECS");
        env::remove_var("TRACKED_SYMBOLS");
        env::remove_var("LEAD_SYMBOL");
        env::remove_var("SPARKLINE_POINTS");
        env::remove_var("HTTP_TIMEOUT_SECS");

        let config = FetcherConfig::from_env();
        assert_eq!(config.snapshot_path, PathBuf::from(DEFAULT_SNAPSHOT_PATH));
        assert_eq!(config.update_interval_secs, 10);
        assert_eq!(config.symbols.len(), 6);
        assert_eq!(config.symbols[0], TrackedSymbol::new("BTC-USD", "Bitcoin"));
        assert_eq!(config.lead_symbol, "BTC");
        assert_eq!(config.sparkline_points, 20);

        env::set_var("SNAPSHOT_PATH", "/tmp/snap.json");
        env::set_var("UPDATE_INTERVAL_SECS", "30");
        env::set_var("TRACKED_SYMBOLS", "ETH-USD:Ethereum, LTC-USD:Litecoin");
        env::set_var("SPARKLINE_POINTS", "not-a-number");
        env::set_var("HTTP_TIMEOUT_SECS", "0");

        let config = FetcherConfig::from_env();
        assert_eq!(config.snapshot_path, PathBuf::from("/tmp/snap.json"));
        assert_eq!(config.update_interval(), Duration::from_secs(30));
        assert_eq!(config.symbols.len(), 2);
        assert_eq!(config.symbols[1].name, "Litecoin");
        assert_eq!(config.sparkline_points, 20);
        // A zero timeout would fail every request
        assert_eq!(config.http_timeout(), Duration::from_secs(10));

        env::remove_var("SNAPSHOT_PATH");
        env::remove_var("UPDATE_INTERVAL_SECS");
        env::remove_var("TRACKED_SYMBOLS");
        env::remove_var("SPARKLINE_POINTS");
        env::remove_var("HTTP_TIMEOUT_SECS");
    }

    #[test]
    fn test_parse_symbol_list() {
        let symbols = parse_symbol_list("BTC-USD:Bitcoin,,DOT-USD , ");
        assert_eq!(symbols.len(), 2);
        assert_eq!(symbols[0].symbol(), "BTC");
        assert_eq!(symbols[1].ticker, "DOT-USD");
        assert_eq!(symbols[1].name, "DOT-USD");
    }

    #[test]
    fn test_analysis_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.seed, 42);
        assert_eq!(config.n_trees, 100);
        assert_eq!(config.cv_folds, 5);
        assert!((config.test_fraction - 0.3).abs() < f64::EPSILON);
    }
}
