//! Market data acquisition
//!
//! - `provider` - provider trait, quote/history types and errors
//! - `yahoo` - Yahoo Finance implementation over HTTP
//! - `fetcher` - per-symbol fetch with history fallback and error containment

pub mod fetcher;
pub mod provider;
pub mod yahoo;

pub use fetcher::{fetch_symbol, SymbolFetch};
pub use provider::{HistoryWindow, MarketDataProvider, PriceBar, ProviderError, Quote};
pub use yahoo::YahooFinanceProvider;
