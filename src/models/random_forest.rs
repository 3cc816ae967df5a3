//! Random forest classifier.

use super::decision_tree::{Criterion, DecisionTree, TreeConfig};
use crate::domain::model::Dataset;
use crate::utils::error::{ChurnError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features considered per split (floor(sqrt(n_features)), at least 1, if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Trees are grown in parallel; tree `i` uses seed `seed + i` for both its
    /// bootstrap sample and its feature sampling, so results do not depend on
    /// thread scheduling.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        if dataset.n_samples() == 0 {
            return Err(ChurnError::ModelError {
                message: "Cannot fit a random forest on zero samples".to_string(),
            });
        }
        if self.config.n_trees == 0 {
            return Err(ChurnError::ModelError {
                message: "A random forest needs at least one tree".to_string(),
            });
        }

        let n_features = dataset.n_features();
        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| default_max_features(n_features))
            .max(1);

        let config = &self.config;
        let trees: Vec<DecisionTree> = (0..config.n_trees)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed.wrapping_add(i as u64);
                let mut tree = DecisionTree::new(TreeConfig {
                    max_depth: config.max_depth,
                    min_samples_split: config.min_samples_split,
                    min_samples_leaf: config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed,
                    criterion: Criterion::Gini,
                });

                if config.bootstrap {
                    let sample = dataset.bootstrap_sample(seed);
                    tree.fit(&sample.features, &sample.labels)?;
                } else {
                    tree.fit(&dataset.features, &dataset.labels)?;
                }

                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        let mut importances = vec![0.0; n_features];
        for tree in &trees {
            for (total, imp) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }
        }
        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= sum);
        }

        tracing::debug!(
            "Random forest fitted: {} trees, max_features={}",
            trees.len(),
            max_features
        );

        self.trees = trees;
        self.n_features = n_features;
        self.feature_importances = importances;
        Ok(())
    }

    /// Mean of the trees' leaf churn fractions.
    pub fn predict_proba_one(&self, row: &[f64]) -> Result<f64> {
        if self.trees.is_empty() {
            return Err(ChurnError::ModelError {
                message: "Random forest has not been fitted".to_string(),
            });
        }

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.predict_value(row)?;
        }
        Ok(total / self.trees.len() as f64)
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}

/// `int(sqrt(n))`, never below one.
fn default_max_features(n_features: usize) -> usize {
    ((n_features as f64).sqrt() as usize).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable(n: usize) -> Dataset {
        let mut dataset = Dataset::new(vec!["x".to_string(), "noise".to_string()]);
        for i in 0..n {
            let x = i as f64 / 20.0;
            let y = if x > 5.0 { 1.0 } else { 0.0 };
            dataset.add_sample(vec![x, (i % 3) as f64], y);
        }
        dataset
    }

    #[test]
    fn classifies_separable_data() {
        let dataset = separable(200);
        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 15,
            max_features: Some(2),
            ..Default::default()
        });
        forest.fit(&dataset).unwrap();

        assert_eq!(forest.n_trees(), 15);
        assert!(forest.predict_proba_one(&[1.0, 0.0]).unwrap() < 0.2);
        assert!(forest.predict_proba_one(&[9.0, 0.0]).unwrap() > 0.8);

        let importances = forest.feature_importances();
        assert_eq!(importances.len(), 2);
        assert!(importances[0] > importances[1]);
        assert!((importances.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fitting_is_deterministic() {
        let dataset = separable(120);
        let config = ForestConfig {
            n_trees: 8,
            ..Default::default()
        };

        let mut a = RandomForest::new(config.clone());
        let mut b = RandomForest::new(config);
        a.fit(&dataset).unwrap();
        b.fit(&dataset).unwrap();

        for row in &dataset.features {
            assert_eq!(
                a.predict_proba_one(row).unwrap(),
                b.predict_proba_one(row).unwrap()
            );
        }
    }

    #[test]
    fn default_features_per_split_rounds_down() {
        assert_eq!(default_max_features(11), 3);
        assert_eq!(default_max_features(16), 4);
        assert_eq!(default_max_features(1), 1);
        assert_eq!(default_max_features(0), 1);

        let names = (0..11).map(|i| format!("f{}", i)).collect();
        let mut dataset = Dataset::new(names);
        for i in 0..40 {
            let row: Vec<f64> = (0..11).map(|j| ((i * (j + 1)) % 7) as f64).collect();
            dataset.add_sample(row, (i % 2) as f64);
        }
        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 1,
            ..Default::default()
        });
        forest.fit(&dataset).unwrap();

        assert_eq!(forest.trees[0].config().max_features, Some(3));
    }

    #[test]
    fn unfitted_forest_is_an_error() {
        let forest = RandomForest::new(ForestConfig::default());
        assert!(forest.predict_proba_one(&[0.0, 0.0]).is_err());
        assert!(RandomForest::new(ForestConfig::default())
            .fit(&Dataset::new(vec!["x".to_string()]))
            .is_err());
    }
}
