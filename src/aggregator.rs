//! Per-symbol record assembly and market-wide aggregation

use crate::market::SymbolFetch;
use crate::metrics::{round_to, DerivedMetrics};
use crate::snapshot::{MarketOverview, SymbolRecord};
use chrono::{DateTime, Local};

#[derive(Debug, PartialEq)]
pub enum AggregateError {
    /// Every symbol failed this cycle; there is nothing to aggregate
    NoSymbols,
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::NoSymbols => write!(f, "no symbols were fetched this cycle"),
        }
    }
}

impl std::error::Error for AggregateError {}

/// A snapshot record plus the unrounded sentiment it was built from.
///
/// The overview averages the unrounded values so the index is not skewed by
/// per-record rounding.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: SymbolRecord,
    pub sentiment: f64,
}

impl ScoredRecord {
    /// Use the record's own (rounded) sentiment
    pub fn from_record(record: SymbolRecord) -> Self {
        let sentiment = record.social_sentiment;
        Self { record, sentiment }
    }
}

/// Build the snapshot record for one fetched symbol.
///
/// Returns `None` when the provider gave no quote for the symbol.
pub fn build_record(
    fetch: &SymbolFetch,
    sparkline_points: usize,
    now: DateTime<Local>,
) -> Option<ScoredRecord> {
    let quote = fetch.quote.as_ref()?;
    let closes = fetch.closes();
    let derived = DerivedMetrics::compute(quote, &closes);

    let sparkline = closes[closes.len().saturating_sub(sparkline_points)..]
        .iter()
        .map(|c| round_to(*c, 2))
        .collect();

    let record = SymbolRecord {
        symbol: fetch.symbol.symbol(),
        name: fetch.symbol.name.clone(),
        price: round_to(quote.price(), 2),
        change_24h: round_to(derived.change_24h, 2),
        volume_24h: non_negative_int(quote.volume()),
        volume_change: round_to(derived.volume_change, 2),
        market_cap: non_negative_int(quote.market_cap()),
        volatility: round_to(derived.volatility, 4),
        sparkline,
        social_sentiment: round_to(derived.sentiment, 2),
        buzz_volume: derived.buzz_volume,
        last_update: now.to_rfc3339(),
    };

    Some(ScoredRecord {
        record,
        sentiment: derived.sentiment,
    })
}

/// Aggregate one cycle's records into the market overview.
///
/// `lead_symbol` is the symbol whose market-cap share is reported as
/// dominance. Dominance is 0 when the lead symbol is missing or the total
/// market cap is 0. An empty record set is an error so the caller can skip
/// the cycle instead of persisting a meaningless overview.
pub fn build_overview(
    scored: &[ScoredRecord],
    lead_symbol: &str,
    now: DateTime<Local>,
) -> Result<MarketOverview, AggregateError> {
    if scored.is_empty() {
        return Err(AggregateError::NoSymbols);
    }
    let records = || scored.iter().map(|s| &s.record);

    let total_market_cap: u64 = records().map(|r| r.market_cap).sum();
    let total_volume: u64 = records().map(|r| r.volume_24h).sum();

    let lead_market_cap = records()
        .find(|r| r.symbol.eq_ignore_ascii_case(lead_symbol))
        .map(|r| r.market_cap)
        .unwrap_or(0);

    let dominance = if total_market_cap > 0 {
        lead_market_cap as f64 / total_market_cap as f64 * 100.0
    } else {
        0.0
    };

    let avg_sentiment = scored.iter().map(|s| s.sentiment).sum::<f64>() / scored.len() as f64;

    Ok(MarketOverview {
        total_market_cap,
        total_volume,
        btc_dominance: round_to(dominance, 2),
        fear_greed_index: fear_greed_index(avg_sentiment),
        social_sentiment: round_to(avg_sentiment, 2),
        timestamp: now.to_rfc3339(),
        last_update: now.format("%Y-%m-%d %H:%M:%S").to_string(),
    })
}

/// Rescale mean sentiment from [-1, 1] onto a 0-100 index
pub fn fear_greed_index(avg_sentiment: f64) -> u8 {
    if !avg_sentiment.is_finite() {
        return 50;
    }
    ((avg_sentiment + 1.0) * 50.0).trunc().clamp(0.0, 100.0) as u8
}

fn non_negative_int(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackedSymbol;
    use crate::market::{PriceBar, Quote};
    use crate::snapshot::tests::sample_record;

    fn scored(records: Vec<SymbolRecord>) -> Vec<ScoredRecord> {
        records.into_iter().map(ScoredRecord::from_record).collect()
    }

    fn fetch_with(quote: Option<Quote>, closes: &[f64]) -> SymbolFetch {
        SymbolFetch {
            symbol: TrackedSymbol::new("BTC-USD", "Bitcoin"),
            quote,
            history: closes
                .iter()
                .enumerate()
                .map(|(i, c)| PriceBar { timestamp: i as i64, close: *c })
                .collect(),
        }
    }

    #[test]
    fn test_build_record_rounds_and_trims_sparkline() {
        let quote = Quote {
            current_price: Some(64_250.456),
            previous_close: Some(63_000.0),
            volume: Some(31_000_000_000.7),
            average_volume: Some(28_000_000_000.0),
            market_cap: Some(1_265_000_000_000.0),
        };
        let closes: Vec<f64> = (0..30).map(|i| 64_000.0 + i as f64 * 10.123).collect();

        let scored = build_record(&fetch_with(Some(quote), &closes), 20, Local::now()).unwrap();
        let record = &scored.record;

        assert_eq!(record.symbol, "BTC");
        assert_eq!(record.name, "Bitcoin");
        assert_eq!(record.price, 64_250.46);
        assert_eq!(record.change_24h, 1.98);
        assert_eq!(record.volume_24h, 31_000_000_000);
        assert_eq!(record.volume_change, 10.71);
        assert_eq!(record.sparkline.len(), 20);
        assert_eq!(record.sparkline[19], 64_293.57);
        assert!((-1.0..=1.0).contains(&record.social_sentiment));
        assert_eq!(record.social_sentiment, round_to(scored.sentiment, 2));
        assert!((1_000..=100_000).contains(&record.buzz_volume));
    }

    #[test]
    fn test_build_record_edge_cases() {
        let quote = Quote {
            current_price: Some(0.5),
            previous_close: Some(0.0),
            volume: None,
            average_volume: Some(0.0),
            market_cap: Some(-10.0),
        };

        let record = build_record(&fetch_with(Some(quote), &[]), 20, Local::now())
            .unwrap()
            .record;
        assert_eq!(record.change_24h, 0.0);
        assert_eq!(record.volume_change, 0.0);
        assert_eq!(record.volatility, 0.02);
        assert_eq!(record.market_cap, 0);
        assert_eq!(record.buzz_volume, 1_000);
        assert!(record.sparkline.is_empty());
    }

    #[test]
    fn test_absent_quote_has_no_record() {
        assert!(build_record(&fetch_with(None, &[1.0, 2.0]), 20, Local::now()).is_none());
    }

    #[test]
    fn test_overview_totals_and_dominance() {
        let records = scored(vec![
            sample_record("BTC", 1_300_000_000_000, 0.5),
            sample_record("ETH", 400_000_000_000, -0.1),
            sample_record("SOL", 70_000_000_000, 0.2),
        ]);

        let overview = build_overview(&records, "BTC", Local::now()).unwrap();

        let expected_total: u64 = records.iter().map(|s| s.record.market_cap).sum();
        assert_eq!(overview.total_market_cap, expected_total);
        assert_eq!(overview.total_volume, 3 * 987_654_321);

        let expected_dominance = 1_300_000_000_000f64 / expected_total as f64 * 100.0;
        assert!((overview.btc_dominance - expected_dominance).abs() < 0.01);

        // mean sentiment 0.2 -> index 60
        assert_eq!(overview.social_sentiment, 0.2);
        assert_eq!(overview.fear_greed_index, 60);
        assert_eq!(overview.last_update.len(), "2026-10-15 12:00:00".len());
    }

    #[test]
    fn test_overview_guards() {
        assert_eq!(
            build_overview(&[], "BTC", Local::now()),
            Err(AggregateError::NoSymbols)
        );

        let zero_caps = scored(vec![sample_record("BTC", 0, 0.0), sample_record("ETH", 0, 0.0)]);
        let overview = build_overview(&zero_caps, "BTC", Local::now()).unwrap();
        assert_eq!(overview.btc_dominance, 0.0);

        let no_lead = scored(vec![sample_record("ETH", 100, 0.0)]);
        let overview = build_overview(&no_lead, "BTC", Local::now()).unwrap();
        assert_eq!(overview.btc_dominance, 0.0);
    }

    #[test]
    fn test_index_uses_unrounded_sentiment() {
        // Each record shows -0.0 after rounding, but the mean is still below zero
        let records: Vec<ScoredRecord> = ["BTC", "ETH"]
            .iter()
            .map(|symbol| ScoredRecord {
                record: sample_record(symbol, 100, round_to(-0.004, 2)),
                sentiment: -0.004,
            })
            .collect();

        let overview = build_overview(&records, "BTC", Local::now()).unwrap();
        assert_eq!(overview.fear_greed_index, 49);
        assert_eq!(overview.social_sentiment, 0.0);
    }

    #[test]
    fn test_fear_greed_bounds() {
        assert_eq!(fear_greed_index(-1.0), 0);
        assert_eq!(fear_greed_index(0.0), 50);
        assert_eq!(fear_greed_index(1.0), 100);
        assert_eq!(fear_greed_index(f64::NAN), 50);
    }
}
