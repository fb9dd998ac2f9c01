//! Random forest regressor

use super::tree::{RegressionTree, TreeConfig};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Random forest configuration
#[derive(Debug, Clone)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features per split (None = all, the usual choice for regression)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Averaging ensemble of bootstrapped regression trees.
///
/// Trees are built in parallel, but each tree owns its seed and results are
/// collected in tree order, so a fixed seed gives identical predictions.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<RegressionTree>,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) {
        let n_samples = targets.len();
        let n_features = features.first().map(|row| row.len()).unwrap_or(0);

        let config = &self.config;
        self.trees = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let indices = if config.bootstrap {
                    bootstrap_indices(n_samples, seed)
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = RegressionTree::new(TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: config.max_features,
                    seed,
                });
                tree.fit(features, targets, &indices);
                tree
            })
            .collect();

        // Mean of per-tree importances, renormalised
        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (total, imp) in self.feature_importances.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_one(row)).sum::<f64>() / self.trees.len() as f64
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn bootstrap_indices(n: usize, seed: u64) -> Vec<usize> {
    if n == 0 {
        return Vec::new();
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let features: Vec<Vec<f64>> = (0..n)
            .map(|i| vec![i as f64 / 10.0, ((i * 7) % 5) as f64])
            .collect();
        let targets = features.iter().map(|row| 3.0 * row[0]).collect();
        (features, targets)
    }

    #[test]
    fn test_forest_learns_dominant_feature() {
        let (features, targets) = linear_data(60);

        let mut forest = RandomForestRegressor::new(ForestConfig {
            n_trees: 20,
            ..Default::default()
        });
        forest.fit(&features, &targets);

        assert_eq!(forest.n_trees(), 20);
        let importances = forest.feature_importances();
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(importances[0] > importances[1]);

        let prediction = forest.predict_one(&[3.0, 0.0]);
        assert!((prediction - 9.0).abs() < 1.0, "got {}", prediction);
    }

    #[test]
    fn test_same_seed_same_predictions() {
        let (features, targets) = linear_data(30);

        let fit = |seed| {
            let mut forest = RandomForestRegressor::new(ForestConfig {
                n_trees: 15,
                seed,
                ..Default::default()
            });
            forest.fit(&features, &targets);
            forest.predict(&features)
        };

        assert_eq!(fit(7), fit(7));
    }

    #[test]
    fn test_bootstrap_indices_in_range() {
        let indices = bootstrap_indices(10, 3);
        assert_eq!(indices.len(), 10);
        assert!(indices.iter().all(|&i| i < 10));
        assert!(bootstrap_indices(0, 3).is_empty());
    }
}
