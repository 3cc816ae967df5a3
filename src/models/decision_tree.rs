//! CART decision tree.
//!
//! Classification trees use Gini impurity on 0/1 targets and store the
//! positive-class fraction in each leaf; regression trees (used as boosting
//! stages) use squared error and store the mean target.

use crate::utils::error::{ChurnError, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Criterion {
    Gini,
    Mse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features sampled per split (None = all)
    pub max_features: Option<usize>,
    pub seed: u64,
    pub criterion: Criterion,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
            criterion: Criterion::Gini,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature_idx: usize,
        threshold: f64,
        n_samples: usize,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

impl TreeNode {
    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    pub fn n_leaves(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 1,
            TreeNode::Split { left, right, .. } => left.n_leaves() + right.n_leaves(),
        }
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.root.is_some()
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.root.as_ref()
    }

    pub fn fit(&mut self, features: &[Vec<f64>], targets: &[f64]) -> Result<()> {
        if features.is_empty() {
            return Err(ChurnError::ModelError {
                message: "Cannot fit a tree on zero samples".to_string(),
            });
        }
        if features.len() != targets.len() {
            return Err(ChurnError::ModelError {
                message: format!(
                    "{} feature rows but {} targets",
                    features.len(),
                    targets.len()
                ),
            });
        }

        self.n_features = features[0].len();
        self.feature_importances = vec![0.0; self.n_features];

        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        let indices: Vec<usize> = (0..features.len()).collect();
        let root = self.build(features, targets, indices, 0, &mut rng);
        self.root = Some(root);

        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }

        Ok(())
    }

    fn build(
        &mut self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + targets[i], sq + targets[i] * targets[i])
        });
        let impurity = self.impurity(n as f64, sum, sum_sq);
        let value = sum / n as f64;

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf.max(1)
            || impurity <= 1e-12
        {
            return TreeNode::Leaf {
                value,
                n_samples: n,
            };
        }

        let Some(best) = self.find_best_split(features, targets, &indices, impurity, rng) else {
            return TreeNode::Leaf {
                value,
                n_samples: n,
            };
        };

        self.feature_importances[best.feature_idx] += n as f64 * best.gain;

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| features[i][best.feature_idx] <= best.threshold);

        let left = self.build(features, targets, left_idx, depth + 1, rng);
        let right = self.build(features, targets, right_idx, depth + 1, rng);

        TreeNode::Split {
            feature_idx: best.feature_idx,
            threshold: best.threshold,
            n_samples: n,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Scans each sampled feature in sorted order, keeping running sums so
    /// every candidate threshold is evaluated in constant time.
    fn find_best_split(
        &self,
        features: &[Vec<f64>],
        targets: &[f64],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf.max(1);
        let max_features = self
            .config
            .max_features
            .unwrap_or(self.n_features)
            .clamp(1, self.n_features.max(1));

        let mut candidates: Vec<usize> = (0..self.n_features).collect();
        candidates.shuffle(rng);
        candidates.truncate(max_features);

        let (total, total_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + targets[i], sq + targets[i] * targets[i])
        });

        let mut best: Option<BestSplit> = None;
        let mut order = indices.to_vec();

        for &feature_idx in &candidates {
            order.sort_by(|&a, &b| features[a][feature_idx].total_cmp(&features[b][feature_idx]));

            let (mut left_sum, mut left_sq) = (0.0, 0.0);
            for pos in 0..n - 1 {
                let i = order[pos];
                left_sum += targets[i];
                left_sq += targets[i] * targets[i];

                let n_left = pos + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let x = features[i][feature_idx];
                let next = features[order[pos + 1]][feature_idx];
                if next <= x {
                    continue;
                }

                let left_impurity = self.impurity(n_left as f64, left_sum, left_sq);
                let right_impurity =
                    self.impurity(n_right as f64, total - left_sum, total_sq - left_sq);
                let weighted =
                    (n_left as f64 * left_impurity + n_right as f64 * right_impurity) / n as f64;
                let gain = parent_impurity - weighted;

                if gain > best.as_ref().map_or(1e-12, |b| b.gain) {
                    let mut threshold = x + (next - x) / 2.0;
                    if threshold >= next {
                        threshold = x;
                    }
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }

    fn impurity(&self, n: f64, sum: f64, sum_sq: f64) -> f64 {
        if n <= 0.0 {
            return 0.0;
        }
        match self.config.criterion {
            Criterion::Gini => {
                let p = sum / n;
                2.0 * p * (1.0 - p)
            }
            Criterion::Mse => {
                let mean = sum / n;
                (sum_sq / n - mean * mean).max(0.0)
            }
        }
    }

    /// Leaf value for `row`: churn fraction for Gini trees, mean target for MSE trees.
    pub fn predict_value(&self, row: &[f64]) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or_else(|| ChurnError::ModelError {
            message: "Decision tree has not been fitted".to_string(),
        })?;

        if row.len() != self.n_features {
            return Err(ChurnError::ModelError {
                message: format!("Expected {} features, got {}", self.n_features, row.len()),
            });
        }

        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }

    pub fn n_leaves(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::n_leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let features = (0..100).map(|i| vec![i as f64 / 10.0, (i % 7) as f64]).collect();
        let labels = (0..100).map(|i| if i >= 50 { 1.0 } else { 0.0 }).collect();
        (features, labels)
    }

    #[test]
    fn learns_a_single_threshold() {
        let (features, labels) = step_data();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&features, &labels).unwrap();

        assert_eq!(tree.predict_value(&[1.0, 0.0]).unwrap(), 0.0);
        assert_eq!(tree.predict_value(&[9.0, 0.0]).unwrap(), 1.0);
        assert_eq!(tree.depth(), 2);
        assert_eq!(tree.n_leaves(), 2);

        match tree.root().unwrap() {
            TreeNode::Split {
                feature_idx,
                threshold,
                ..
            } => {
                assert_eq!(*feature_idx, 0);
                assert!((threshold - 4.95).abs() < 1e-9);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }

        assert_eq!(tree.feature_importances(), &[1.0, 0.0]);
    }

    #[test]
    fn respects_depth_and_leaf_limits() {
        let features: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64]).collect();
        let labels: Vec<f64> = (0..40).map(|i| (i % 2) as f64).collect();

        let mut tree = DecisionTree::new(TreeConfig {
            max_depth: 3,
            min_samples_leaf: 5,
            ..Default::default()
        });
        tree.fit(&features, &labels).unwrap();

        assert!(tree.depth() <= 4);
        fn min_leaf(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { n_samples, .. } => *n_samples,
                TreeNode::Split { left, right, .. } => min_leaf(left).min(min_leaf(right)),
            }
        }
        assert!(min_leaf(tree.root().unwrap()) >= 5);
    }

    #[test]
    fn regression_leaves_hold_means() {
        let features: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let targets: Vec<f64> = (0..20).map(|i| if i < 10 { -2.0 } else { 3.0 }).collect();

        let mut tree = DecisionTree::new(TreeConfig {
            criterion: Criterion::Mse,
            ..Default::default()
        });
        tree.fit(&features, &targets).unwrap();

        assert!((tree.predict_value(&[0.0]).unwrap() + 2.0).abs() < 1e-12);
        assert!((tree.predict_value(&[19.0]).unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn unfitted_or_misshaped_input_is_an_error() {
        let tree = DecisionTree::new(TreeConfig::default());
        assert!(tree.predict_value(&[1.0]).is_err());

        let (features, labels) = step_data();
        let mut tree = DecisionTree::new(TreeConfig::default());
        tree.fit(&features, &labels).unwrap();
        assert!(tree.predict_value(&[1.0]).is_err());
        assert!(tree.fit(&features, &labels[..10]).is_err());
    }
}
