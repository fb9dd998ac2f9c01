//! Integration tests for the offline analysis job
//!
//! A fixed 10-row snapshot is written to disk, analysed twice with the same
//! seed, and the resulting reports are compared.

#[cfg(test)]
mod analysis_pipeline_tests {
    use cryptoflow::analysis::{run_analysis, AnalysisError};
    use cryptoflow::config::AnalysisConfig;
    use cryptoflow::snapshot::{
        write_json_atomic, MarketOverview, Snapshot, SnapshotMetadata, SymbolRecord,
    };
    use serde_json::Value;
    use std::path::Path;
    use tempfile::tempdir;

    fn record(i: usize) -> SymbolRecord {
        let sentiment = [-0.62, -0.35, -0.1, 0.05, 0.18, 0.33, 0.47, 0.58, 0.71, 0.86][i];
        SymbolRecord {
            symbol: format!("SYM{}", i),
            name: format!("Synthetic {}", i),
            price: 10.0 * (i + 1) as f64,
            change_24h: sentiment * 4.0 + (i % 3) as f64 * 0.5,
            volume_24h: 1_000_000 * (i as u64 + 1),
            volume_change: 5.0 - i as f64,
            market_cap: 1_000_000_000 * (10 - i as u64),
            volatility: 0.012 + 0.003 * i as f64,
            sparkline: vec![9.5, 10.0],
            social_sentiment: sentiment,
            buzz_volume: 1_000 + 2_500 * i as i64,
            last_update: "2024-05-01T12:00:00+00:00".to_string(),
        }
    }

    fn write_snapshot(path: &Path, rows: usize) {
        let snapshot = Snapshot {
            cryptocurrencies: (0..rows).map(record).collect(),
            market_overview: MarketOverview {
                total_market_cap: 0,
                total_volume: 0,
                btc_dominance: 0.0,
                fear_greed_index: 50,
                social_sentiment: 0.0,
                timestamp: "2024-05-01T12:00:00+00:00".to_string(),
                last_update: "2024-05-01 12:00:00".to_string(),
            },
            metadata: SnapshotMetadata {
                update_interval: 10,
                last_fetch: "2024-05-01T12:00:00+00:00".to_string(),
            },
        };
        write_json_atomic(path, &snapshot).unwrap();
    }

    fn config(dir: &Path, report: &str) -> AnalysisConfig {
        AnalysisConfig {
            snapshot_path: dir.join("crypto-prices.json"),
            report_path: dir.join(report),
            n_trees: 25,
            ..Default::default()
        }
    }

    #[test]
    fn test_fixed_seed_reproduces_metrics() {
        let dir = tempdir().unwrap();
        write_snapshot(&dir.path().join("crypto-prices.json"), 10);

        let first = run_analysis(&config(dir.path(), "first.json")).unwrap();
        let second = run_analysis(&config(dir.path(), "second.json")).unwrap();

        assert_eq!(first.ml_metrics, second.ml_metrics);
        assert_eq!(first.feature_importances, second.feature_importances);
        assert_eq!(first.correlations, second.correlations);
        assert!(first.ml_metrics.volatility_mse.is_finite());
        assert!(first.ml_metrics.price_mse.is_finite());
    }

    #[test]
    fn test_report_json_layout() {
        let dir = tempdir().unwrap();
        write_snapshot(&dir.path().join("crypto-prices.json"), 10);
        let config = config(dir.path(), "ml-analysis-results.json");

        run_analysis(&config).unwrap();

        let json: Value =
            serde_json::from_str(&std::fs::read_to_string(&config.report_path).unwrap()).unwrap();

        for key in [
            "timestamp",
            "cryptocurrencies",
            "ml_metrics",
            "feature_importances",
            "cross_validation",
            "correlations",
            "insights",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        for key in ["volatility_mse", "volatility_r2", "price_mse", "price_r2"] {
            assert!(json["ml_metrics"][key].is_number(), "missing ml_metrics.{}", key);
        }

        assert_eq!(json["cryptocurrencies"].as_array().unwrap().len(), 10);
        assert_eq!(json["insights"]["top_sentiment"][0]["symbol"], "SYM9");
        assert_eq!(json["correlations"].as_object().unwrap().len(), 5);
        // Seven training rows cannot fill five folds, so CV is omitted
        assert!(json["cross_validation"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_single_record_is_rejected() {
        let dir = tempdir().unwrap();
        write_snapshot(&dir.path().join("crypto-prices.json"), 1);

        let err = run_analysis(&config(dir.path(), "report.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::TooFewSamples(1)));
    }

    #[test]
    fn test_missing_snapshot_is_an_error() {
        let dir = tempdir().unwrap();

        let err = run_analysis(&config(dir.path(), "report.json")).unwrap_err();
        assert!(matches!(err, AnalysisError::Snapshot(_)));
        assert!(!dir.path().join("report.json").exists());
    }
}
