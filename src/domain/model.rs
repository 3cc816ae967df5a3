use crate::utils::error::{ChurnError, Result};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const CUSTOMER_ID: &str = "CustomerID";
pub const CHURN_LABEL: &str = "Churn Label";
pub const CHURN_VALUE: &str = "Churn Value";
pub const CHURN_REASON: &str = "Churn Reason";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, Value>,
}

impl Record {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.data.get(column).filter(|v| !v.is_null())
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(|v| v.as_str())
    }

    /// Numeric view of a cell. Strings are parsed after trimming.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn set(&mut self, column: &str, value: Value) {
        self.data.insert(column.to_string(), value);
    }
}

/// Renders a cell the way it is written back to CSV. `None` for missing cells.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(true) => Some("True".to_string()),
        Value::Bool(false) => Some("False".to_string()),
        other => Some(other.to_string()),
    }
}

pub fn number_value(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Rows with an explicit column order, as read from a CSV export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn push_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    /// Parses CSV bytes. Empty cells become `null`, everything else a string.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let columns: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
        let mut table = Table::new(columns);

        for row in reader.records() {
            let row = row?;
            let mut record = Record::default();
            for (column, cell) in table.columns.iter().zip(row.iter()) {
                let value = if cell.trim().is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                record.data.insert(column.clone(), value);
            }
            table.records.push(record);
        }

        Ok(table)
    }

    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&self.columns)?;

        for record in &self.records {
            let row: Vec<String> = self
                .columns
                .iter()
                .map(|c| {
                    record
                        .data
                        .get(c)
                        .and_then(value_to_text)
                        .unwrap_or_default()
                })
                .collect();
            writer.write_record(&row)?;
        }

        writer
            .into_inner()
            .map_err(|e| ChurnError::ProcessingError {
                message: format!("Failed to flush CSV output: {}", e),
            })
    }
}

/// Numeric model inputs, one row per customer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn n_samples(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Features plus binary labels (1.0 = churned).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    pub fn new(feature_names: Vec<String>) -> Self {
        Self {
            features: Vec::new(),
            labels: Vec::new(),
            feature_names,
        }
    }

    pub fn from_matrix(matrix: FeatureMatrix, labels: Vec<f64>) -> Result<Self> {
        if matrix.rows.len() != labels.len() {
            return Err(ChurnError::ProcessingError {
                message: format!(
                    "Feature rows ({}) and labels ({}) differ in length",
                    matrix.rows.len(),
                    labels.len()
                ),
            });
        }

        Ok(Self {
            features: matrix.rows,
            labels,
            feature_names: matrix.feature_names,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn add_sample(&mut self, features: Vec<f64>, label: f64) {
        debug_assert_eq!(features.len(), self.feature_names.len());
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Sample with replacement, same size as the dataset.
    pub fn bootstrap_sample(&self, seed: u64) -> Dataset {
        let n = self.n_samples();
        if n == 0 {
            return self.clone();
        }

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        self.subset(&indices)
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l > 0.5).count()
    }
}
