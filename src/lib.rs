//! Crypto market snapshot poller with offline analysis.
//!
//! - `fetcher` polls the market-data provider, derives sentiment and
//!   volatility per symbol and rewrites one JSON snapshot every interval.
//! - `analyze` fits random-forest regressions over the latest snapshot and
//!   writes a report.
//! - `dashboard` runs the fetcher next to a static file server.

pub mod aggregator;
pub mod analysis;
pub mod config;
pub mod launcher;
pub mod market;
pub mod metrics;
pub mod refresh;
pub mod snapshot;
