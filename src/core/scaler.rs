use crate::utils::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

/// Z-score standardization fitted on the training rows only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        !self.means.is_empty()
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub fn fit(&mut self, rows: &[Vec<f64>]) -> Result<()> {
        let first = rows.first().ok_or_else(|| ChurnError::ProcessingError {
            message: "Cannot fit a scaler on zero rows".to_string(),
        })?;
        let n_features = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            check_width(row, n_features)?;
            for (m, v) in means.iter_mut().zip(row) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0; n_features];
        for row in rows {
            for ((var, v), m) in variances.iter_mut().zip(row).zip(&means) {
                *var += (v - m).powi(2);
            }
        }

        // constant columns are left unscaled
        self.scales = variances
            .into_iter()
            .map(|var| {
                let std = (var / n).sqrt();
                if std > 1e-12 {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        self.means = means;

        Ok(())
    }

    pub fn transform_one(&self, row: &[f64]) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(ChurnError::ModelError {
                message: "Scaler has not been fitted".to_string(),
            });
        }
        check_width(row, self.means.len())?;

        Ok(row
            .iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        rows.iter().map(|row| self.transform_one(row)).collect()
    }

    pub fn fit_transform(&mut self, rows: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        self.fit(rows)?;
        self.transform(rows)
    }
}

fn check_width(row: &[f64], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(ChurnError::ModelError {
            message: format!("Expected {} features, got {}", expected, row.len()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns() {
        let rows = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&rows).unwrap();

        assert_eq!(scaler.means(), &[2.0, 5.0]);
        assert_eq!(scaler.scales(), &[1.0, 1.0]);
        assert_eq!(scaled, vec![vec![-1.0, 0.0], vec![1.0, 0.0]]);
    }

    #[test]
    fn uses_population_deviation() {
        let rows = vec![vec![0.0], vec![0.0], vec![6.0], vec![6.0]];
        let mut scaler = StandardScaler::new();
        scaler.fit(&rows).unwrap();
        assert!((scaler.scales()[0] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_unfitted_and_wrong_width() {
        let scaler = StandardScaler::new();
        assert!(scaler.transform_one(&[1.0]).is_err());

        let mut scaler = StandardScaler::new();
        scaler.fit(&[vec![1.0, 2.0]]).unwrap();
        assert!(scaler.transform_one(&[1.0]).is_err());
        assert!(StandardScaler::new().fit(&[]).is_err());
    }
}
