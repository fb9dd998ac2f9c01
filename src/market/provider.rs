//! Market data provider interface

use async_trait::async_trait;

/// Current quote fields for one ticker. Every field is optional because the
/// provider omits whatever it does not know.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Quote {
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    pub volume: Option<f64>,
    pub average_volume: Option<f64>,
    pub market_cap: Option<f64>,
}

impl Quote {
    pub fn price(&self) -> f64 {
        self.current_price.unwrap_or(0.0)
    }

    /// Previous close, falling back to the current price when unknown
    pub fn previous_close_or_price(&self) -> f64 {
        self.previous_close.unwrap_or_else(|| self.price())
    }

    pub fn volume(&self) -> f64 {
        self.volume.unwrap_or(0.0)
    }

    /// Average volume, falling back to the current volume when unknown
    pub fn average_volume_or_volume(&self) -> f64 {
        self.average_volume.unwrap_or_else(|| self.volume())
    }

    pub fn market_cap(&self) -> f64 {
        self.market_cap.unwrap_or(0.0)
    }
}

/// One bar of intraday history. Only the close is used downstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBar {
    pub timestamp: i64,
    pub close: f64,
}

/// History granularity requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    /// Last day at one-minute bars
    Intraday,
    /// Last five days at hourly bars, used when `Intraday` is empty
    Extended,
}

impl HistoryWindow {
    pub fn range(&self) -> &'static str {
        match self {
            HistoryWindow::Intraday => "1d",
            HistoryWindow::Extended => "5d",
        }
    }

    pub fn interval(&self) -> &'static str {
        match self {
            HistoryWindow::Intraday => "1m",
            HistoryWindow::Extended => "1h",
        }
    }
}

#[derive(Debug)]
pub enum ProviderError {
    Http(reqwest::Error),
    Status(u16),
    Decode(String),
    MissingData(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Http(err)
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Decode(err.to_string())
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::Http(e) => write!(f, "HTTP error: {}", e),
            ProviderError::Status(code) => write!(f, "provider returned status {}", code),
            ProviderError::Decode(msg) => write!(f, "decode error: {}", msg),
            ProviderError::MissingData(msg) => write!(f, "missing data: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Source of quotes and short price histories.
///
/// Implementations must be shareable across tasks; the refresh loop holds one
/// behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn quote(&self, ticker: &str) -> Result<Quote, ProviderError>;

    /// Bars ordered oldest first. An empty vector is a valid answer.
    async fn history(
        &self,
        ticker: &str,
        window: HistoryWindow,
    ) -> Result<Vec<PriceBar>, ProviderError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}
