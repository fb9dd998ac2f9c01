//! Snapshot persistence
//!
//! The snapshot is the only artifact the live fetcher produces. Each cycle
//! replaces the previous file completely. Writes go to a temp file in the
//! destination directory which is then renamed over the target, so readers
//! never observe a half-written snapshot.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One tracked symbol in one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    #[serde(rename = "change24h")]
    pub change_24h: f64,
    #[serde(rename = "volume24h")]
    pub volume_24h: u64,
    #[serde(rename = "volumeChange")]
    pub volume_change: f64,
    #[serde(rename = "marketCap")]
    pub market_cap: u64,
    pub volatility: f64,
    pub sparkline: Vec<f64>,
    #[serde(rename = "socialSentiment")]
    pub social_sentiment: f64,
    #[serde(rename = "buzzVolume")]
    pub buzz_volume: i64,
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
}

/// Market-wide figures recomputed from the records of one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    #[serde(rename = "totalMarketCap")]
    pub total_market_cap: u64,
    #[serde(rename = "totalVolume")]
    pub total_volume: u64,
    #[serde(rename = "btcDominance")]
    pub btc_dominance: f64,
    #[serde(rename = "fearGreedIndex")]
    pub fear_greed_index: u8,
    #[serde(rename = "socialSentiment")]
    pub social_sentiment: f64,
    /// RFC 3339
    pub timestamp: String,
    /// `YYYY-MM-DD HH:MM:SS`, local time
    #[serde(rename = "lastUpdate")]
    pub last_update: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// Seconds between cycles
    #[serde(rename = "updateInterval")]
    pub update_interval: u64,
    #[serde(rename = "lastFetch")]
    pub last_fetch: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cryptocurrencies: Vec<SymbolRecord>,
    #[serde(rename = "marketOverview")]
    pub market_overview: MarketOverview,
    pub metadata: SnapshotMetadata,
}

#[derive(Debug)]
pub enum SnapshotError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
}

impl From<std::io::Error> for SnapshotError {
    fn from(err: std::io::Error) -> Self {
        SnapshotError::Io(err)
    }
}

impl From<serde_json::Error> for SnapshotError {
    fn from(err: serde_json::Error) -> Self {
        SnapshotError::Serialization(err)
    }
}

impl From<tempfile::PersistError> for SnapshotError {
    fn from(err: tempfile::PersistError) -> Self {
        SnapshotError::Io(err.error)
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::Io(e) => write!(f, "IO error: {}", e),
            SnapshotError::Serialization(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Destination for finished snapshots
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Replace the previously written snapshot
    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), SnapshotError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}

/// Writes the snapshot as pretty-printed JSON to a single file
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSink for JsonFileSink {
    async fn write_snapshot(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        let path = self.path.clone();
        let owned = snapshot.clone();
        tokio::task::spawn_blocking(move || write_json_atomic(&path, &owned))
            .await
            .map_err(|e| SnapshotError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;
        log::debug!(
            "Saved {} records to {}",
            snapshot.cryptocurrencies.len(),
            self.path.display()
        );
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "JSON"
    }
}

/// Mode given to a snapshot file that does not exist yet
#[cfg(unix)]
pub const DEFAULT_FILE_MODE: u32 = 0o644;

/// Serialize `value` as pretty JSON and atomically replace `path` with it.
///
/// The parent directory is created when missing. The replacement keeps the
/// permissions of the file it replaces, or [`DEFAULT_FILE_MODE`] for a new
/// file, so a server running as another user can still read it.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), SnapshotError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let json = serde_json::to_string_pretty(value)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    #[cfg(unix)]
    tmp.as_file().set_permissions(published_permissions(path))?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;

    Ok(())
}

#[cfg(unix)]
fn published_permissions(path: &Path) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;

    fs::metadata(path)
        .map(|meta| meta.permissions())
        .unwrap_or_else(|_| fs::Permissions::from_mode(DEFAULT_FILE_MODE))
}

/// Load a snapshot written by [`JsonFileSink`]
pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let json = fs::read_to_string(path)?;
    let snapshot: Snapshot = serde_json::from_str(&json)?;

    log::info!(
        "Loaded snapshot with {} records from {}",
        snapshot.cryptocurrencies.len(),
        path.display()
    );
    Ok(snapshot)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn sample_record(symbol: &str, market_cap: u64, sentiment: f64) -> SymbolRecord {
        SymbolRecord {
            symbol: symbol.to_string(),
            name: format!("{} Coin", symbol),
            price: 1234.56,
            change_24h: -2.31,
            volume_24h: 987_654_321,
            volume_change: 12.5,
            market_cap,
            volatility: 0.0123,
            sparkline: vec![1230.1, 1231.25, 1234.56],
            social_sentiment: sentiment,
            buzz_volume: 1_086,
            last_update: "2026-10-15T12:00:00.000001+00:00".to_string(),
        }
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            cryptocurrencies: vec![
                sample_record("BTC", 1_300_000_000_000, 0.42),
                sample_record("ETH", 400_000_000_000, -0.17),
            ],
            market_overview: MarketOverview {
                total_market_cap: 1_700_000_000_000,
                total_volume: 1_975_308_642,
                btc_dominance: 76.47,
                fear_greed_index: 56,
                social_sentiment: 0.125,
                timestamp: "2026-10-15T12:00:00+00:00".to_string(),
                last_update: "2026-10-15 12:00:00".to_string(),
            },
            metadata: SnapshotMetadata {
                update_interval: 10,
                last_fetch: "2026-10-15T12:00:00+00:00".to_string(),
            },
        }
    }

    #[test]
    fn test_json_keys_match_dashboard_contract() {
        let value = serde_json::to_value(sample_snapshot()).unwrap();

        let record = &value["cryptocurrencies"][0];
        for key in [
            "symbol", "name", "price", "change24h", "volume24h", "volumeChange", "marketCap",
            "volatility", "sparkline", "socialSentiment", "buzzVolume", "lastUpdate",
        ] {
            assert!(record.get(key).is_some(), "missing record key {}", key);
        }

        let overview = &value["marketOverview"];
        for key in [
            "totalMarketCap", "totalVolume", "btcDominance", "fearGreedIndex",
            "socialSentiment", "timestamp", "lastUpdate",
        ] {
            assert!(overview.get(key).is_some(), "missing overview key {}", key);
        }

        assert_eq!(value["metadata"]["updateInterval"], 10);
    }

    #[tokio::test]
    async fn test_write_then_load_is_exact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/crypto-prices.json");
        let sink = JsonFileSink::new(&path);

        let snapshot = sample_snapshot();
        sink.write_snapshot(&snapshot).await.unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[tokio::test]
    async fn test_write_replaces_previous_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("crypto-prices.json");
        let sink = JsonFileSink::new(&path);

        let mut snapshot = sample_snapshot();
        sink.write_snapshot(&snapshot).await.unwrap();

        snapshot.cryptocurrencies.truncate(1);
        snapshot.cryptocurrencies[0].price = 1.5;
        sink.write_snapshot(&snapshot).await.unwrap();

        let loaded = load_snapshot(&path).unwrap();
        assert_eq!(loaded.cryptocurrencies.len(), 1);
        assert_eq!(loaded.cryptocurrencies[0].price, 1.5);

        // No temp files left behind
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_file_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("crypto-prices.json");
        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;

        write_json_atomic(&path, &sample_snapshot()).unwrap();
        assert_eq!(mode(&path), DEFAULT_FILE_MODE);

        // An operator-chosen mode survives the next cycle
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();
        write_json_atomic(&path, &sample_snapshot()).unwrap();
        assert_eq!(mode(&path), 0o640);
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = load_snapshot(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(SnapshotError::Io(_))));
    }
}
