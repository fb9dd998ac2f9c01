//! Regression metrics and K-fold cross-validation

use super::forest::{ForestConfig, RandomForestRegressor};
use serde::Serialize;

pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Coefficient of determination. A constant target scores 1.0 when predicted
/// exactly and 0.0 otherwise.
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[derive(Debug, PartialEq)]
pub enum CrossValidationError {
    /// Not enough rows to give every fold a meaningful test set
    TooFewSamples { samples: usize, folds: usize },
}

impl std::fmt::Display for CrossValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrossValidationError::TooFewSamples { samples, folds } => write!(
                f,
                "{} folds need at least {} samples, got {}",
                folds,
                folds * 2,
                samples
            ),
        }
    }
}

impl std::error::Error for CrossValidationError {}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossValidationSummary {
    pub scores: Vec<f64>,
    pub mean: f64,
    /// Population standard deviation of the fold scores
    pub std_dev: f64,
}

/// R² of a freshly fitted forest on each of `folds` contiguous folds.
///
/// Every fold must hold at least two rows so R² is defined.
pub fn cross_validate(
    features: &[Vec<f64>],
    targets: &[f64],
    folds: usize,
    config: &ForestConfig,
) -> Result<CrossValidationSummary, CrossValidationError> {
    let n = targets.len();
    if folds < 2 || n < folds * 2 {
        return Err(CrossValidationError::TooFewSamples { samples: n, folds });
    }

    let mut scores = Vec::with_capacity(folds);
    let mut start = 0;
    for fold in 0..folds {
        // The first n % folds folds take one extra row
        let size = n / folds + usize::from(fold < n % folds);
        let end = start + size;

        let train_idx: Vec<usize> = (0..start).chain(end..n).collect();
        let train_x: Vec<Vec<f64>> = train_idx.iter().map(|&i| features[i].clone()).collect();
        let train_y: Vec<f64> = train_idx.iter().map(|&i| targets[i]).collect();

        let mut model = RandomForestRegressor::new(config.clone());
        model.fit(&train_x, &train_y);

        let predicted = model.predict(&features[start..end]);
        scores.push(r2_score(&targets[start..end], &predicted));

        start = end;
    }

    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let std_dev =
        (scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64).sqrt();

    Ok(CrossValidationSummary {
        scores,
        mean,
        std_dev,
    })
}
