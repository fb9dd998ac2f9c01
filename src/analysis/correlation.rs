//! Pearson correlation over the numeric analysis columns

use super::dataset::{AnalysisRow, Feature};
use std::collections::BTreeMap;

/// Columns included in the correlation matrix, in report order
pub const CORRELATION_FEATURES: [Feature; 5] = [
    Feature::Sentiment,
    Feature::BuzzVolume,
    Feature::Volatility,
    Feature::Change24h,
    Feature::Volume24h,
];

/// `matrix[column][row]`; `None` where a column has no variance
pub type CorrelationMatrix = BTreeMap<String, BTreeMap<String, Option<f64>>>;

/// Pearson correlation; `None` for fewer than two points or zero variance
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

pub fn column(rows: &[AnalysisRow], feature: Feature) -> Vec<f64> {
    rows.iter().map(|row| row.get(feature)).collect()
}

pub fn correlation_matrix(rows: &[AnalysisRow]) -> CorrelationMatrix {
    let columns: Vec<(Feature, Vec<f64>)> = CORRELATION_FEATURES
        .iter()
        .map(|f| (*f, column(rows, *f)))
        .collect();

    columns
        .iter()
        .map(|(outer, xs)| {
            let inner = columns
                .iter()
                .map(|(inner, ys)| (inner.as_str().to_string(), pearson(xs, ys)))
                .collect();
            (outer.as_str().to_string(), inner)
        })
        .collect()
}

/// Correlation between two columns of the rows
pub fn correlation_between(rows: &[AnalysisRow], a: Feature, b: Feature) -> Option<f64> {
    pearson(&column(rows, a), &column(rows, b))
}
