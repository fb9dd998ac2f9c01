//! Derived metrics for a single symbol
//!
//! The sentiment score is a heuristic built from price change, volatility and
//! volume change. It is not derived from text or social data and is not a
//! calibrated probability.

use crate::market::Quote;

/// Volatility reported when there is not enough history to measure it
pub const DEFAULT_VOLATILITY: f64 = 0.02;

pub const MIN_BUZZ: i64 = 1_000;
pub const MAX_BUZZ: i64 = 100_000;

/// Metrics computed from one quote and its sampled closes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedMetrics {
    pub change_24h: f64,
    pub volume_change: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub buzz_volume: i64,
}

impl DerivedMetrics {
    pub fn compute(quote: &Quote, closes: &[f64]) -> Self {
        let change_24h = percent_change(quote.price(), quote.previous_close_or_price());
        let volume = quote.volume();
        let volume_change = volume_change(volume, quote.average_volume_or_volume());
        let volatility = return_volatility(closes);

        Self {
            change_24h,
            volume_change,
            volatility,
            sentiment: sentiment_score(change_24h, volatility, volume_change),
            buzz_volume: buzz_volume(volume, volume_change),
        }
    }
}

/// Percentage change from `previous` to `current`; 0 when `previous <= 0`
pub fn percent_change(current: f64, previous: f64) -> f64 {
    if !(previous > 0.0) || !current.is_finite() {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Percentage deviation of `volume` from `average`; 0 when `average <= 0`
pub fn volume_change(volume: f64, average: f64) -> f64 {
    if !(average > 0.0) || !volume.is_finite() {
        return 0.0;
    }
    (volume - average) / average * 100.0
}

/// Sample standard deviation of period-over-period simple returns.
///
/// Returns [`DEFAULT_VOLATILITY`] when fewer than two returns can be formed,
/// which covers empty and single-point histories.
pub fn return_volatility(closes: &[f64]) -> f64 {
    if closes.len() < 2 {
        return DEFAULT_VOLATILITY;
    }

    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] != 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .filter(|r| r.is_finite())
        .collect();

    if returns.len() < 2 {
        return DEFAULT_VOLATILITY;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let stdev = variance.sqrt().abs();

    if stdev.is_finite() {
        stdev
    } else {
        DEFAULT_VOLATILITY
    }
}

/// Heuristic sentiment in [-1, 1].
///
/// `tanh(change / 10)` damps outliers, high volatility attenuates the score by
/// up to half and unusual volume amplifies it by up to 30%.
pub fn sentiment_score(change_24h: f64, volatility: f64, volume_change: f64) -> f64 {
    let base = (change_24h / 10.0).tanh();
    let volatility_factor = 1.0 - (volatility * 10.0).min(0.5);
    let volume_factor = 1.0 + (volume_change.abs() / 100.0).min(0.3);

    let score = base * volatility_factor * volume_factor;
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0)
}

/// Synthetic attention proxy scaled from volume, clamped to [1000, 100000]
pub fn buzz_volume(volume: f64, volume_change: f64) -> i64 {
    let volume = if volume.is_finite() { volume.max(0.0) } else { 0.0 };
    let change = if volume_change.is_finite() { volume_change.abs() } else { 0.0 };

    let raw = (volume / 1e9).min(100.0) * 1000.0 * (1.0 + change / 100.0);
    (raw.trunc() as i64).clamp(MIN_BUZZ, MAX_BUZZ)
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
