//! L2-regularized logistic regression trained with batch gradient descent.

use super::sigmoid;
use crate::domain::model::Dataset;
use crate::utils::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    coefficients: Vec<f64>,
    intercept: f64,
    learning_rate: f64,
    max_iter: usize,
    tolerance: f64,
    /// Inverse of the regularization strength `C`
    l2_penalty: f64,
    fitted: bool,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(0.1, 1000, 1e-6, 1.0)
    }
}

impl LogisticRegression {
    pub fn new(learning_rate: f64, max_iter: usize, tolerance: f64, l2_penalty: f64) -> Self {
        Self {
            coefficients: Vec::new(),
            intercept: 0.0,
            learning_rate,
            max_iter,
            tolerance,
            l2_penalty,
            fitted: false,
            n_iter: 0,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Iterations run by the last `fit`.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }

    pub fn fit(&mut self, dataset: &Dataset) -> Result<()> {
        let n = dataset.n_samples();
        if n == 0 {
            return Err(ChurnError::ModelError {
                message: "Cannot fit logistic regression on zero samples".to_string(),
            });
        }

        let n_features = dataset.n_features();
        let n_f = n as f64;
        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        self.n_iter = 0;

        for _ in 0..self.max_iter {
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;

            for (row, &label) in dataset.features.iter().zip(&dataset.labels) {
                let z = bias + dot(&weights, row);
                let err = sigmoid(z) - label;
                for (g, x) in grad_w.iter_mut().zip(row) {
                    *g += err * x;
                }
                grad_b += err;
            }

            let mut max_grad = (grad_b / n_f).abs();
            for (g, w) in grad_w.iter_mut().zip(&weights) {
                *g = *g / n_f + self.l2_penalty * w / n_f;
                max_grad = max_grad.max(g.abs());
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * g;
            }
            bias -= self.learning_rate * grad_b / n_f;
            self.n_iter += 1;

            if max_grad < self.tolerance {
                break;
            }
        }

        tracing::debug!("Logistic regression converged after {} iteration(s)", self.n_iter);

        self.coefficients = weights;
        self.intercept = bias;
        self.fitted = true;
        Ok(())
    }

    pub fn predict_proba_one(&self, row: &[f64]) -> Result<f64> {
        if !self.fitted {
            return Err(ChurnError::ModelError {
                message: "Logistic regression has not been fitted".to_string(),
            });
        }
        if row.len() != self.coefficients.len() {
            return Err(ChurnError::ModelError {
                message: format!(
                    "Expected {} features, got {}",
                    self.coefficients.len(),
                    row.len()
                ),
            });
        }

        Ok(sigmoid(self.intercept + dot(&self.coefficients, row)))
    }

    /// Absolute coefficients, normalized to sum to one.
    pub fn feature_importances(&self) -> Vec<f64> {
        let abs: Vec<f64> = self.coefficients.iter().map(|c| c.abs()).collect();
        let sum: f64 = abs.iter().sum();
        if sum > 0.0 {
            abs.into_iter().map(|a| a / sum).collect()
        } else {
            abs
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn learns_direction_of_signal() {
        let mut dataset = Dataset::new(vec!["signal".to_string(), "flat".to_string()]);
        for i in 0..100 {
            let x = (i as f64 - 50.0) / 25.0;
            dataset.add_sample(vec![x, 0.0], if x > 0.0 { 1.0 } else { 0.0 });
        }

        let mut model = LogisticRegression::default();
        model.fit(&dataset).unwrap();

        assert!(model.coefficients()[0] > 0.0);
        assert_eq!(model.coefficients()[1], 0.0);
        assert!(model.predict_proba_one(&[1.5, 0.0]).unwrap() > 0.8);
        assert!(model.predict_proba_one(&[-1.5, 0.0]).unwrap() < 0.2);
        assert_eq!(model.feature_importances(), vec![1.0, 0.0]);
    }

    #[test]
    fn predicting_before_fit_fails() {
        let model = LogisticRegression::default();
        assert!(model.predict_proba_one(&[0.0]).is_err());
    }
}
