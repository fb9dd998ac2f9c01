//! CART regression tree

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Regression tree configuration
#[derive(Debug, Clone)]
pub struct TreeConfig {
    /// Maximum depth (None = grow until leaves are pure or too small)
    pub max_depth: Option<usize>,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Features considered per split (None = all)
    pub max_features: Option<usize>,
    /// Seed for feature sampling
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    left: Vec<usize>,
    right: Vec<usize>,
    gain: f64,
}

/// Regression tree minimising squared error
#[derive(Debug, Clone)]
pub struct RegressionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    feature_importances: Vec<f64>,
}

impl RegressionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            feature_importances: Vec::new(),
        }
    }

    /// Fit on the rows of `features` selected by `indices` (repeats allowed)
    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64], indices: &[usize]) {
        let n_features = features.first().map(|row| row.len()).unwrap_or(0);
        self.feature_importances = vec![0.0; n_features];

        if indices.is_empty() {
            self.root = Some(TreeNode::Leaf { value: 0.0 });
            return;
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let root = self.build(features, targets, indices, 0, &mut rng);
        self.root = Some(root);

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let labels: Vec<f64> = indices.iter().map(|&i| targets[i]).collect();
        let impurity = variance(&labels);
        let value = mean(&labels);

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || indices.len() < self.config.min_samples_split || impurity < 1e-12 {
            return TreeNode::Leaf { value };
        }

        match self.find_best_split(features, targets, indices, impurity, rng) {
            Some(split) => {
                self.feature_importances[split.feature_idx] += split.gain * indices.len() as f64;

                let left = self.build(features, targets, &split.left, depth + 1, rng);
                let right = self.build(features, targets, &split.right, depth + 1, rng);

                TreeNode::Split {
                    feature_idx: split.feature_idx,
                    threshold: split.threshold,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            None => TreeNode::Leaf { value },
        }
    }

    fn find_best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = features[indices[0]].len();
        let max_features = self.config.max_features.unwrap_or(n_features).clamp(1, n_features.max(1));

        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(max_features);

        let n_total = indices.len() as f64;
        let mut best: Option<BestSplit> = None;

        for &feature_idx in &candidates {
            let mut values: Vec<f64> = indices.iter().map(|&i| features[i][feature_idx]).collect();
            values.sort_by(|a, b| a.total_cmp(b));
            values.dedup();

            for pair in values.windows(2) {
                let threshold = (pair[0] + pair[1]) / 2.0;

                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| features[i][feature_idx] <= threshold);

                if left.len() < self.config.min_samples_leaf
                    || right.len() < self.config.min_samples_leaf
                {
                    continue;
                }

                let left_labels: Vec<f64> = left.iter().map(|&i| targets[i]).collect();
                let right_labels: Vec<f64> = right.iter().map(|&i| targets[i]).collect();

                let weighted = (left.len() as f64 * variance(&left_labels)
                    + right.len() as f64 * variance(&right_labels))
                    / n_total;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map(|b| b.gain).unwrap_or(0.0) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        left,
                        right,
                        gain,
                    });
                }
            }
        }

        best
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        let mut node = match &self.root {
            Some(root) => root,
            None => return 0.0,
        };

        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature_idx] <= *threshold { left.as_ref() } else { right.as_ref() };
                }
            }
        }
    }

    /// Normalised impurity decrease per feature (sums to 1 unless the tree is a single leaf)
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}
