//! Churn classifiers.
//!
//! Every model outputs the probability that a customer churns. [`ChurnModel`]
//! wraps whichever kind was configured so the rest of the pipeline (and the
//! artifact bundle) deals with a single type.

pub mod decision_tree;
pub mod gradient_boosting;
pub mod logistic;
pub mod random_forest;

pub use decision_tree::{Criterion, DecisionTree, TreeConfig, TreeNode};
pub use gradient_boosting::{BoostingConfig, GradientBoosting};
pub use logistic::LogisticRegression;
pub use random_forest::{ForestConfig, RandomForest};

use crate::core::metrics;
use crate::domain::model::Dataset;
use crate::utils::error::{ChurnError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DECISION_THRESHOLD: f64 = 0.5;

/// Parsed the same way from TOML and from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Logistic,
    #[default]
    RandomForest,
    GradientBoosting,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModelKind::Logistic => "logistic",
            ModelKind::RandomForest => "random_forest",
            ModelKind::GradientBoosting => "gradient_boosting",
        };
        f.write_str(name)
    }
}

impl FromStr for ModelKind {
    type Err = ChurnError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "logistic" | "logistic_regression" => Ok(ModelKind::Logistic),
            "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            "gradient_boosting" | "xgboost" | "gbm" => Ok(ModelKind::GradientBoosting),
            _ => Err(ChurnError::InvalidConfigValueError {
                field: "model.kind".to_string(),
                value: s.to_string(),
                reason: "Expected one of: logistic, random_forest, gradient_boosting".to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ModelKind {
    type Error = ChurnError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelKind> for String {
    fn from(kind: ModelKind) -> Self {
        kind.to_string()
    }
}

/// Hyper-parameters for all model kinds; each kind reads the ones it uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: Option<usize>,
    pub learning_rate: f64,
    pub boosting_max_depth: usize,
    pub max_iter: usize,
    pub l2_penalty: f64,
    pub seed: u64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            learning_rate: 0.1,
            boosting_max_depth: 3,
            max_iter: 1000,
            l2_penalty: 1.0,
            seed: 42,
        }
    }
}

pub trait Classifier: Send + Sync {
    fn fit(&mut self, dataset: &Dataset) -> Result<()>;

    /// Probability that the customer described by `row` churns.
    fn predict_proba_one(&self, row: &[f64]) -> Result<f64>;

    fn feature_importances(&self) -> Vec<f64>;

    fn predict_one(&self, row: &[f64]) -> Result<f64> {
        Ok(if self.predict_proba_one(row)? > DECISION_THRESHOLD {
            1.0
        } else {
            0.0
        })
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.par_iter().map(|row| self.predict_proba_one(row)).collect()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.par_iter().map(|row| self.predict_one(row)).collect()
    }

    /// Mean accuracy on `dataset`.
    fn score(&self, dataset: &Dataset) -> Result<f64> {
        let predictions = self.predict(&dataset.features)?;
        Ok(metrics::accuracy(&dataset.labels, &predictions))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum ChurnModel {
    Logistic(LogisticRegression),
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl ChurnModel {
    pub fn new(kind: ModelKind, params: &ModelParams) -> Self {
        match kind {
            ModelKind::Logistic => ChurnModel::Logistic(LogisticRegression::new(
                params.learning_rate,
                params.max_iter,
                1e-6,
                params.l2_penalty,
            )),
            ModelKind::RandomForest => ChurnModel::RandomForest(RandomForest::new(ForestConfig {
                n_trees: params.n_estimators,
                max_depth: params.max_depth,
                min_samples_split: params.min_samples_split,
                min_samples_leaf: params.min_samples_leaf,
                max_features: params.max_features,
                bootstrap: true,
                seed: params.seed,
            })),
            ModelKind::GradientBoosting => {
                ChurnModel::GradientBoosting(GradientBoosting::new(BoostingConfig {
                    n_estimators: params.n_estimators,
                    learning_rate: params.learning_rate,
                    max_depth: params.boosting_max_depth,
                    min_samples_split: params.min_samples_split,
                    min_samples_leaf: params.min_samples_leaf,
                    seed: params.seed,
                }))
            }
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ChurnModel::Logistic(_) => ModelKind::Logistic,
            ChurnModel::RandomForest(_) => ModelKind::RandomForest,
            ChurnModel::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }
}

impl Classifier for ChurnModel {
    fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        match self {
            ChurnModel::Logistic(m) => m.fit(dataset),
            ChurnModel::RandomForest(m) => m.fit(dataset),
            ChurnModel::GradientBoosting(m) => m.fit(dataset),
        }
    }

    fn predict_proba_one(&self, row: &[f64]) -> Result<f64> {
        match self {
            ChurnModel::Logistic(m) => m.predict_proba_one(row),
            ChurnModel::RandomForest(m) => m.predict_proba_one(row),
            ChurnModel::GradientBoosting(m) => m.predict_proba_one(row),
        }
    }

    fn feature_importances(&self) -> Vec<f64> {
        match self {
            ChurnModel::Logistic(m) => m.feature_importances(),
            ChurnModel::RandomForest(m) => m.feature_importances().to_vec(),
            ChurnModel::GradientBoosting(m) => m.feature_importances().to_vec(),
        }
    }
}

pub(crate) fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let exp_z = z.exp();
        exp_z / (1.0 + exp_z)
    }
}
