//! Analysis rows, feature matrices, splitting and scaling

use crate::snapshot::{Snapshot, SymbolRecord};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Flattened view of one snapshot record used by the analysis job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub change_24h: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub volatility: f64,
    pub sentiment: f64,
    pub buzz_volume: f64,
}

impl From<&SymbolRecord> for AnalysisRow {
    fn from(record: &SymbolRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            name: record.name.clone(),
            price: record.price,
            change_24h: record.change_24h,
            volume_24h: record.volume_24h as f64,
            market_cap: record.market_cap as f64,
            volatility: record.volatility,
            sentiment: record.social_sentiment,
            buzz_volume: record.buzz_volume as f64,
        }
    }
}

impl AnalysisRow {
    pub fn from_snapshot(snapshot: &Snapshot) -> Vec<Self> {
        snapshot.cryptocurrencies.iter().map(Self::from).collect()
    }

    /// Feature value; non-finite values are read as 0
    pub fn get(&self, feature: Feature) -> f64 {
        let value = match feature {
            Feature::Sentiment => self.sentiment,
            Feature::BuzzVolume => self.buzz_volume,
            Feature::Change24h => self.change_24h,
            Feature::Volume24h => self.volume_24h,
            Feature::Volatility => self.volatility,
        };
        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

/// Numeric columns available to models and correlations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Sentiment,
    BuzzVolume,
    Change24h,
    Volume24h,
    Volatility,
}

impl Feature {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Sentiment => "sentiment",
            Feature::BuzzVolume => "buzz_volume",
            Feature::Change24h => "change_24h",
            Feature::Volume24h => "volume_24h",
            Feature::Volatility => "volatility",
        }
    }
}

/// Feature matrix plus regression target
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    /// n_samples x n_features
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn from_rows(rows: &[AnalysisRow], features: &[Feature], target: Feature) -> Self {
        Self {
            feature_names: features.iter().map(|f| f.as_str().to_string()).collect(),
            features: rows
                .iter()
                .map(|row| features.iter().map(|f| row.get(*f)).collect())
                .collect(),
            targets: rows.iter().map(|row| row.get(target)).collect(),
        }
    }

    pub fn n_samples(&self) -> usize {
        self.targets.len()
    }

    /// Rows at `indices`, in that order
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            feature_names: self.feature_names.clone(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            targets: indices.iter().map(|&i| self.targets[i]).collect(),
        }
    }
}

/// Shuffle `0..n` with a seeded RNG and cut off `ceil(n * test_fraction)` test rows.
///
/// Both sides keep at least one row when `n >= 2`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    if n < 2 {
        return (indices, Vec::new());
    }

    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let train = indices.split_off(n_test);
    (train, indices)
}

/// Per-column standardisation: `(x - mean) / std`, fitted on training rows only
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(features: &[Vec<f64>]) -> Self {
        let n_features = features.first().map(|row| row.len()).unwrap_or(0);
        let n = features.len() as f64;

        let mut means = vec![0.0; n_features];
        let mut scales = vec![1.0; n_features];
        if features.is_empty() {
            return Self { means, scales };
        }

        for j in 0..n_features {
            let mean = features.iter().map(|row| row[j]).sum::<f64>() / n;
            let variance = features.iter().map(|row| (row[j] - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();

            means[j] = mean;
            // Constant columns are centred but not scaled
            scales[j] = if std > 0.0 && std.is_finite() { std } else { 1.0 };
        }

        Self { means, scales }
    }

    pub fn transform(&self, features: &[Vec<f64>]) -> Vec<Vec<f64>> {
        features
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(j, x)| (x - self.means[j]) / self.scales[j])
                    .collect()
            })
            .collect()
    }

    pub fn fit_transform(features: &[Vec<f64>]) -> (Self, Vec<Vec<f64>>) {
        let scaler = Self::fit(features);
        let scaled = scaler.transform(features);
        (scaler, scaled)
    }
}
