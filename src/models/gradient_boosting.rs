//! Gradient-boosted trees for binary log-loss.
//!
//! Each stage fits a shallow regression tree to the residuals `y - p` and is
//! added to the raw log-odds score with shrinkage `learning_rate`.

use super::decision_tree::{Criterion, DecisionTree, TreeConfig};
use super::sigmoid;
use crate::domain::model::Dataset;
use crate::utils::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientBoosting {
    config: BoostingConfig,
    base_score: f64,
    trees: Vec<DecisionTree>,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl GradientBoosting {
    pub fn new(config: BoostingConfig) -> Self {
        Self {
            config,
            base_score: 0.0,
            trees: Vec::new(),
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn n_stages(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let n = dataset.n_samples();
        if n == 0 {
            return Err(ChurnError::ModelError {
                message: "Cannot fit gradient boosting on zero samples".to_string(),
            });
        }

        // prior log-odds
        let p = (dataset.positive_count() as f64 / n as f64).clamp(1e-6, 1.0 - 1e-6);
        let base_score = (p / (1.0 - p)).ln();

        let n_features = dataset.n_features();
        let mut raw = vec![base_score; n];
        let mut trees = Vec::with_capacity(self.config.n_estimators);
        let mut importances = vec![0.0; n_features];

        for stage in 0..self.config.n_estimators {
            let residuals: Vec<f64> = dataset
                .labels
                .iter()
                .zip(&raw)
                .map(|(y, f)| y - sigmoid(*f))
                .collect();

            let mut tree = DecisionTree::new(TreeConfig {
                max_depth: self.config.max_depth,
                min_samples_split: self.config.min_samples_split,
                min_samples_leaf: self.config.min_samples_leaf,
                max_features: None,
                seed: self.config.seed.wrapping_add(stage as u64),
                criterion: Criterion::Mse,
            });
            tree.fit(&dataset.features, &residuals)?;

            for (score, row) in raw.iter_mut().zip(&dataset.features) {
                *score += self.config.learning_rate * tree.predict_value(row)?;
            }
            for (total, imp) in importances.iter_mut().zip(tree.feature_importances()) {
                *total += imp;
            }

            trees.push(tree);
        }

        let sum: f64 = importances.iter().sum();
        if sum > 0.0 {
            importances.iter_mut().for_each(|imp| *imp /= sum);
        }

        self.base_score = base_score;
        self.trees = trees;
        self.n_features = n_features;
        self.feature_importances = importances;
        Ok(())
    }

    pub fn predict_proba_one(&self, row: &[f64]) -> Result<f64> {
        if self.n_features == 0 {
            return Err(ChurnError::ModelError {
                message: "Gradient boosting model has not been fitted".to_string(),
            });
        }
        if row.len() != self.n_features {
            return Err(ChurnError::ModelError {
                message: format!("Expected {} features, got {}", self.n_features, row.len()),
            });
        }

        let mut raw = self.base_score;
        for tree in &self.trees {
            raw += self.config.learning_rate * tree.predict_value(row)?;
        }
        Ok(sigmoid(raw))
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
