//! Yahoo Finance API Integration
//!
//! Provides quote fields and short price histories for crypto tickers:
//! - Current price and previous close
//! - Current and average volume
//! - Market capitalization
//! - Intraday closes
//!
//! ## API Reference
//!
//! Quotes:  {base}/v7/finance/quote?symbols={ticker}&crumb={crumb}
//! History: {base}/v8/finance/chart/{ticker}?range={range}&interval={interval}
//!
//! The quote endpoint needs a session cookie plus a matching crumb. The
//! cookie comes from a request to `fc.yahoo.com`, the crumb from
//! `{base}/v1/test/getcrumb`. Both are cached until the quote endpoint
//! answers 401. When no crumb can be obtained the quote falls back to the
//! chart metadata, which carries price, previous close and volume but no
//! market cap.
//!
//! Response parsing lives in `parse_quote` / `parse_chart` / `parse_chart_meta`
//! / `parse_crumb` so it can be tested without the network.

use super::provider::{HistoryWindow, MarketDataProvider, PriceBar, ProviderError, Quote};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

const USER_AGENT: &str = "Mozilla/5.0 (compatible; cryptoflow/0.1)";

/// Sets the session cookie the crumb is tied to (answers 404, which is fine)
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";

#[derive(Debug, Deserialize)]
struct QuoteEnvelope {
    #[serde(rename = "quoteResponse")]
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Vec<QuoteResult>,
}

#[derive(Debug, Deserialize)]
struct QuoteResult {
    symbol: String,
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "regularMarketPreviousClose")]
    regular_market_previous_close: Option<f64>,
    #[serde(rename = "regularMarketVolume")]
    regular_market_volume: Option<f64>,
    #[serde(rename = "averageDailyVolume3Month")]
    average_daily_volume_3_month: Option<f64>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartResponse,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<f64>,
    #[serde(rename = "chartPreviousClose")]
    chart_previous_close: Option<f64>,
    #[serde(rename = "previousClose")]
    previous_close: Option<f64>,
    #[serde(rename = "regularMarketVolume")]
    regular_market_volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Market data provider backed by the public Yahoo Finance endpoints
pub struct YahooFinanceProvider {
    client: reqwest::Client,
    base_url: String,
    cookie_url: String,
    crumb: Mutex<Option<String>>,
}

impl YahooFinanceProvider {
    /// Build a provider with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            crumb: Mutex::new(None),
        })
    }

    /// Fetch the session cookie from `cookie_url` instead of `fc.yahoo.com`
    pub fn with_cookie_url(mut self, cookie_url: &str) -> Self {
        self.cookie_url = cookie_url.to_string();
        self
    }

    async fn get_text(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ProviderError> {
        log::debug!("GET {}", url);

        let response = self.client.get(url).query(query).send().await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }

    /// Cached crumb, performing the cookie handshake on first use
    async fn crumb(&self) -> Result<String, ProviderError> {
        let mut cached = self.crumb.lock().await;
        if let Some(crumb) = cached.as_ref() {
            return Ok(crumb.clone());
        }

        // Only the Set-Cookie header matters here
        self.client.get(&self.cookie_url).send().await?;

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let crumb = parse_crumb(&self.get_text(&url, &[]).await?)?;
        log::debug!("Obtained Yahoo crumb");

        *cached = Some(crumb.clone());
        Ok(crumb)
    }

    async fn crumb_quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        let crumb = self.crumb().await?;
        let url = format!("{}/v7/finance/quote", self.base_url);

        match self
            .get_text(&url, &[("symbols", ticker), ("crumb", crumb.as_str())])
            .await
        {
            Ok(body) => parse_quote(&body, ticker),
            Err(ProviderError::Status(401)) => {
                // Session expired; the next call repeats the handshake
                *self.crumb.lock().await = None;
                Err(ProviderError::Status(401))
            }
            Err(e) => Err(e),
        }
    }

    /// Quote fields from the chart metadata, which needs no crumb
    async fn chart_quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let body = self
            .get_text(&url, &[("range", "1d"), ("interval", "1d")])
            .await?;
        parse_chart_meta(&body)
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    async fn quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
        match self.crumb_quote(ticker).await {
            Ok(quote) => Ok(quote),
            Err(e) => {
                log::debug!("Quote endpoint failed for {} ({}), using chart metadata", ticker, e);
                self.chart_quote(ticker).await
            }
        }
    }

    async fn history(
        &self,
        ticker: &str,
        window: HistoryWindow,
    ) -> Result<Vec<PriceBar>, ProviderError> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, ticker);
        let body = self
            .get_text(&url, &[("range", window.range()), ("interval", window.interval())])
            .await?;
        parse_chart(&body)
    }

    fn provider_name(&self) -> &'static str {
        "Yahoo Finance"
    }
}

/// Extract the quote for `ticker` from a `/v7/finance/quote` body
pub fn parse_quote(body: &str, ticker: &str) -> Result<Quote, ProviderError> {
    let envelope: QuoteEnvelope = serde_json::from_str(body)?;

    let result = envelope
        .quote_response
        .result
        .into_iter()
        .find(|r| r.symbol.eq_ignore_ascii_case(ticker))
        .ok_or_else(|| ProviderError::MissingData(format!("no quote for {}", ticker)))?;

    Ok(Quote {
        current_price: result.regular_market_price,
        previous_close: result.regular_market_previous_close,
        volume: result.regular_market_volume,
        average_volume: result.average_daily_volume_3_month,
        market_cap: result.market_cap,
    })
}

/// Validate a `/v1/test/getcrumb` body. An HTML or JSON page means the
/// cookie handshake did not take.
pub fn parse_crumb(body: &str) -> Result<String, ProviderError> {
    let crumb = body.trim();
    let looks_like_page = crumb.starts_with('<') || crumb.starts_with('{');
    if crumb.is_empty() || looks_like_page || crumb.contains(char::is_whitespace) {
        return Err(ProviderError::MissingData("no crumb in response".to_string()));
    }
    Ok(crumb.to_string())
}

/// Quote fields from the `meta` block of a `/v8/finance/chart` body.
///
/// The chart carries no average volume or market cap, so those stay `None`.
pub fn parse_chart_meta(body: &str) -> Result<Quote, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(ProviderError::MissingData(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let meta = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .and_then(|result| result.meta)
        .ok_or_else(|| ProviderError::MissingData("no chart metadata".to_string()))?;

    if meta.regular_market_price.is_none() {
        return Err(ProviderError::MissingData("no price in chart metadata".to_string()));
    }

    Ok(Quote {
        current_price: meta.regular_market_price,
        previous_close: meta.chart_previous_close.or(meta.previous_close),
        volume: meta.regular_market_volume,
        average_volume: None,
        market_cap: None,
    })
}

/// Extract closes from a `/v8/finance/chart` body. Bars with a null close are dropped.
pub fn parse_chart(body: &str) -> Result<Vec<PriceBar>, ProviderError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(ProviderError::MissingData(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let result = match envelope.chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => return Ok(Vec::new()),
    };

    let closes = match result.indicators.quote.into_iter().next() {
        Some(quote) => quote.close,
        None => return Ok(Vec::new()),
    };

    Ok(result
        .timestamp
        .into_iter()
        .zip(closes)
        .filter_map(|(timestamp, close)| {
            close
                .filter(|c| c.is_finite())
                .map(|close| PriceBar { timestamp, close })
        })
        .collect())
}
