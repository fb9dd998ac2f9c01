//! Per-symbol snapshot fetch
//!
//! Provider failures stop here: a failed symbol is logged and reported as
//! absent, and the caller builds a degraded snapshot from whatever succeeded.
//! There is no retry inside a cycle; the next cycle is the retry.

use super::provider::{HistoryWindow, MarketDataProvider, PriceBar, ProviderError, Quote};
use crate::config::TrackedSymbol;

/// Raw provider output for one symbol in one cycle
#[derive(Debug, Clone)]
pub struct SymbolFetch {
    pub symbol: TrackedSymbol,
    /// `None` when the provider failed for this symbol
    pub quote: Option<Quote>,
    /// Oldest first; empty when no history could be fetched
    pub history: Vec<PriceBar>,
}

impl SymbolFetch {
    pub fn absent(symbol: TrackedSymbol) -> Self {
        Self {
            symbol,
            quote: None,
            history: Vec::new(),
        }
    }

    pub fn closes(&self) -> Vec<f64> {
        self.history.iter().map(|bar| bar.close).collect()
    }
}

/// Fetch quote and history for one symbol. Never fails.
pub async fn fetch_symbol(provider: &dyn MarketDataProvider, symbol: &TrackedSymbol) -> SymbolFetch {
    match try_fetch(provider, &symbol.ticker).await {
        Ok((quote, history)) => SymbolFetch {
            symbol: symbol.clone(),
            quote: Some(quote),
            history,
        },
        Err(e) => {
            log::warn!("⚠️  Error fetching {}: {}", symbol.ticker, e);
            SymbolFetch::absent(symbol.clone())
        }
    }
}

async fn try_fetch(
    provider: &dyn MarketDataProvider,
    ticker: &str,
) -> Result<(Quote, Vec<PriceBar>), ProviderError> {
    let quote = provider.quote(ticker).await?;

    let mut history = provider.history(ticker, HistoryWindow::Intraday).await?;
    if history.is_empty() {
        log::debug!("No intraday rows for {}, falling back to hourly bars", ticker);
        history = provider.history(ticker, HistoryWindow::Extended).await?;
    }

    Ok((quote, history))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        intraday: Vec<PriceBar>,
        extended: Vec<PriceBar>,
        fail_quote: bool,
        windows_requested: Mutex<Vec<HistoryWindow>>,
    }

    impl ScriptedProvider {
        fn new(intraday: Vec<PriceBar>, extended: Vec<PriceBar>) -> Self {
            Self {
                intraday,
                extended,
                fail_quote: false,
                windows_requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MarketDataProvider for ScriptedProvider {
        async fn quote(&self, ticker: &str) -> Result<Quote, ProviderError> {
            if self.fail_quote {
                return Err(ProviderError::MissingData(ticker.to_string()));
            }
            Ok(Quote {
                current_price: Some(10.0),
                ..Default::default()
            })
        }

        async fn history(
            &self,
            _ticker: &str,
            window: HistoryWindow,
        ) -> Result<Vec<PriceBar>, ProviderError> {
            self.windows_requested.lock().unwrap().push(window);
            Ok(match window {
                HistoryWindow::Intraday => self.intraday.clone(),
                HistoryWindow::Extended => self.extended.clone(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "scripted"
        }
    }

    fn bar(close: f64) -> PriceBar {
        PriceBar { timestamp: 0, close }
    }

    #[tokio::test]
    async fn test_uses_intraday_when_available() {
        let provider = ScriptedProvider::new(vec![bar(1.0), bar(2.0)], vec![bar(9.0)]);
        let fetch = fetch_symbol(&provider, &TrackedSymbol::new("BTC-USD", "Bitcoin")).await;

        assert_eq!(fetch.closes(), vec![1.0, 2.0]);
        assert_eq!(*provider.windows_requested.lock().unwrap(), vec![HistoryWindow::Intraday]);
    }

    #[tokio::test]
    async fn test_falls_back_to_extended_window() {
        let provider = ScriptedProvider::new(vec![], vec![bar(9.0), bar(9.5)]);
        let fetch = fetch_symbol(&provider, &TrackedSymbol::new("BTC-USD", "Bitcoin")).await;

        assert!(fetch.quote.is_some());
        assert_eq!(fetch.closes(), vec![9.0, 9.5]);
        assert_eq!(
            *provider.windows_requested.lock().unwrap(),
            vec![HistoryWindow::Intraday, HistoryWindow::Extended]
        );
    }

    #[tokio::test]
    async fn test_provider_error_yields_absent_symbol() {
        let mut provider = ScriptedProvider::new(vec![bar(1.0)], vec![]);
        provider.fail_quote = true;

        let fetch = fetch_symbol(&provider, &TrackedSymbol::new("XRP-USD", "Ripple")).await;
        assert!(fetch.quote.is_none());
        assert!(fetch.history.is_empty());
    }
}
