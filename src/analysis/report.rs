//! Consolidated analysis report written once per run

use super::correlation::CorrelationMatrix;
use super::dataset::AnalysisRow;
use super::evaluation::CrossValidationSummary;
use super::insights::Insights;
use crate::snapshot::{write_json_atomic, SnapshotError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetrics {
    pub volatility_mse: f64,
    pub volatility_r2: f64,
    pub price_mse: f64,
    pub price_r2: f64,
}

/// Cross-validation per model; a model whose run failed is left out
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrossValidationReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility: Option<CrossValidationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<CrossValidationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureImportances {
    pub volatility: BTreeMap<String, f64>,
    pub price: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub timestamp: DateTime<Utc>,
    pub cryptocurrencies: Vec<AnalysisRow>,
    pub ml_metrics: ModelMetrics,
    pub feature_importances: FeatureImportances,
    pub cross_validation: CrossValidationReport,
    pub correlations: CorrelationMatrix,
    pub insights: Insights,
}

impl AnalysisReport {
    pub fn write_to(&self, path: &Path) -> Result<(), SnapshotError> {
        write_json_atomic(path, self)?;
        log::info!("💾 Analysis report written to {}", path.display());
        Ok(())
    }
}
