//! Offline analysis of the latest snapshot
//!
//! Two random-forest regressions are fitted on the snapshot rows:
//! volatility from [sentiment, buzz, 24h change, 24h volume] and 24h change
//! from [sentiment, buzz, volatility]. Features are standardised with
//! statistics from the training split only. The job also reports Pearson
//! correlations and a few ranked subsets, then writes one JSON report.

pub mod correlation;
pub mod dataset;
pub mod evaluation;
pub mod forest;
pub mod insights;
pub mod report;
pub mod tree;

pub use dataset::{AnalysisRow, Dataset, Feature, StandardScaler};
pub use evaluation::{CrossValidationError, CrossValidationSummary};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use report::AnalysisReport;

use crate::config::AnalysisConfig;
use crate::snapshot::{load_snapshot, SnapshotError};
use chrono::Utc;
use std::collections::BTreeMap;

use self::correlation::{correlation_between, correlation_matrix};
use self::evaluation::{cross_validate, mean_squared_error, r2_score};
use self::insights::{assess_model, Insights};
use self::report::{CrossValidationReport, FeatureImportances, ModelMetrics};

pub const VOLATILITY_FEATURES: [Feature; 4] = [
    Feature::Sentiment,
    Feature::BuzzVolume,
    Feature::Change24h,
    Feature::Volume24h,
];

pub const PRICE_FEATURES: [Feature; 3] = [Feature::Sentiment, Feature::BuzzVolume, Feature::Volatility];

#[derive(Debug)]
pub enum AnalysisError {
    Snapshot(SnapshotError),
    /// A train/test split needs at least two rows
    TooFewSamples(usize),
}

impl From<SnapshotError> for AnalysisError {
    fn from(err: SnapshotError) -> Self {
        AnalysisError::Snapshot(err)
    }
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Snapshot(e) => write!(f, "Snapshot error: {}", e),
            AnalysisError::TooFewSamples(n) => {
                write!(f, "Need at least 2 records to analyse, got {}", n)
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Outcome of fitting one model
#[derive(Debug, Clone)]
pub struct ModelOutcome {
    pub mse: f64,
    pub r2: f64,
    pub importances: BTreeMap<String, f64>,
    pub cross_validation: Option<CrossValidationSummary>,
}

/// Split, scale, fit and score one forest on `dataset`
pub fn fit_model(label: &str, dataset: &Dataset, config: &AnalysisConfig) -> ModelOutcome {
    let (train_idx, test_idx) =
        dataset::train_test_split(dataset.n_samples(), config.test_fraction, config.seed);
    let train = dataset.subset(&train_idx);
    let test = dataset.subset(&test_idx);

    let (scaler, train_x) = StandardScaler::fit_transform(&train.features);
    let test_x = scaler.transform(&test.features);

    let forest_config = ForestConfig {
        n_trees: config.n_trees,
        seed: config.seed,
        ..Default::default()
    };
    let mut model = RandomForestRegressor::new(forest_config.clone());
    model.fit(&train_x, &train.targets);

    let predicted = model.predict(&test_x);
    let mse = mean_squared_error(&test.targets, &predicted);
    let r2 = r2_score(&test.targets, &predicted);

    log::info!(
        "📈 {} model: train={} test={} MSE={:.6} R²={:.4}",
        label,
        train.n_samples(),
        test.n_samples(),
        mse,
        r2
    );

    let importances: BTreeMap<String, f64> = dataset
        .feature_names
        .iter()
        .cloned()
        .zip(model.feature_importances().iter().copied())
        .collect();
    for (name, importance) in &importances {
        log::debug!("   {} importance {:.4}", name, importance);
    }

    let cross_validation =
        match cross_validate(&train_x, &train.targets, config.cv_folds, &forest_config) {
            Ok(summary) => {
                log::info!(
                    "   {} CV R²: {:.4} (+/- {:.4})",
                    label,
                    summary.mean,
                    summary.std_dev * 2.0
                );
                Some(summary)
            }
            Err(e) => {
                log::warn!("⚠️  {} cross-validation skipped: {}", label, e);
                None
            }
        };

    ModelOutcome {
        mse,
        r2,
        importances,
        cross_validation,
    }
}

/// Run the full analysis over already loaded rows
pub fn analyze_rows(
    rows: Vec<AnalysisRow>,
    config: &AnalysisConfig,
) -> Result<AnalysisReport, AnalysisError> {
    if rows.len() < 2 {
        return Err(AnalysisError::TooFewSamples(rows.len()));
    }

    let volatility_data = Dataset::from_rows(&rows, &VOLATILITY_FEATURES, Feature::Volatility);
    let price_data = Dataset::from_rows(&rows, &PRICE_FEATURES, Feature::Change24h);

    let volatility = fit_model("Volatility", &volatility_data, config);
    let price = fit_model("Price change", &price_data, config);

    let correlations = correlation_matrix(&rows);
    for (a, b) in [
        (Feature::Sentiment, Feature::Volatility),
        (Feature::Sentiment, Feature::Change24h),
        (Feature::BuzzVolume, Feature::Volatility),
    ] {
        match correlation_between(&rows, a, b) {
            Some(r) => log::info!("🔗 {} vs {}: {:.3}", a.as_str(), b.as_str(), r),
            None => log::info!("🔗 {} vs {}: undefined", a.as_str(), b.as_str()),
        }
    }

    let insights = Insights::from_rows(&rows);
    log::info!(
        "💡 {} stable positive, {} high activity",
        insights.stable_positive.len(),
        insights.high_activity.len()
    );
    assess_model("Volatility", volatility.r2);
    assess_model("Price change", price.r2);

    Ok(AnalysisReport {
        timestamp: Utc::now(),
        cryptocurrencies: rows,
        ml_metrics: ModelMetrics {
            volatility_mse: volatility.mse,
            volatility_r2: volatility.r2,
            price_mse: price.mse,
            price_r2: price.r2,
        },
        feature_importances: FeatureImportances {
            volatility: volatility.importances,
            price: price.importances,
        },
        cross_validation: CrossValidationReport {
            volatility: volatility.cross_validation,
            price: price.cross_validation,
        },
        correlations,
        insights,
    })
}

/// Load the snapshot, analyse it and write the report
pub fn run_analysis(config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError> {
    log::info!("🚀 Analysing {}", config.snapshot_path.display());

    let snapshot = load_snapshot(&config.snapshot_path)?;
    let rows = AnalysisRow::from_snapshot(&snapshot);

    let report = analyze_rows(rows, config)?;
    report.write_to(&config.report_path)?;

    log::info!("✅ Analysis complete");
    Ok(report)
}
