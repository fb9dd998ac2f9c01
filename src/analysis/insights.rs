//! Ranked and threshold-filtered subsets of the analysed rows

use super::dataset::{AnalysisRow, Feature};
use serde::Serialize;

pub const TOP_N: usize = 3;
pub const STABLE_MIN_SENTIMENT: f64 = 0.5;
pub const STABLE_MAX_VOLATILITY: f64 = 0.04;

/// R² above which a model is reported as usable
pub const GOOD_MODEL_R2: f64 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub top_sentiment: Vec<AnalysisRow>,
    pub top_volatility: Vec<AnalysisRow>,
    /// Sentiment above 0.5 with volatility under 0.04
    pub stable_positive: Vec<AnalysisRow>,
    /// Above the median on both buzz and volatility
    pub high_activity: Vec<AnalysisRow>,
}

impl Insights {
    pub fn from_rows(rows: &[AnalysisRow]) -> Self {
        let median_buzz = median(rows.iter().map(|r| r.get(Feature::BuzzVolume)).collect());
        let median_volatility = median(rows.iter().map(|r| r.get(Feature::Volatility)).collect());

        Self {
            top_sentiment: top_by(rows, Feature::Sentiment, TOP_N),
            top_volatility: top_by(rows, Feature::Volatility, TOP_N),
            stable_positive: rows
                .iter()
                .filter(|r| {
                    r.get(Feature::Sentiment) > STABLE_MIN_SENTIMENT
                        && r.get(Feature::Volatility) < STABLE_MAX_VOLATILITY
                })
                .cloned()
                .collect(),
            high_activity: rows
                .iter()
                .filter(|r| {
                    r.get(Feature::BuzzVolume) > median_buzz
                        && r.get(Feature::Volatility) > median_volatility
                })
                .cloned()
                .collect(),
        }
    }
}

/// Highest `n` rows by `feature`; ties keep snapshot order
pub fn top_by(rows: &[AnalysisRow], feature: Feature, n: usize) -> Vec<AnalysisRow> {
    let mut sorted: Vec<&AnalysisRow> = rows.iter().collect();
    sorted.sort_by(|a, b| b.get(feature).total_cmp(&a.get(feature)));
    sorted.into_iter().take(n).cloned().collect()
}

/// Median, averaging the middle pair for even counts; 0 when empty
pub fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

pub fn assess_model(name: &str, r2: f64) {
    if r2 > GOOD_MODEL_R2 {
        log::info!("✅ {} model explains the data well (R² = {:.3})", name, r2);
    } else {
        log::warn!("⚠️  {} model has weak predictive power (R² = {:.3})", name, r2);
    }
}
