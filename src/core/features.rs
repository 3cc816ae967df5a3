//! Feature preparation: label-encoding of categorical columns and median
//! imputation of numeric ones.
//!
//! The fitted [`FeatureTransformers`] are kept with the model so that new
//! customers go through exactly the same encoding at scoring time.

use crate::core::encoder::LabelEncoder;
use crate::core::preprocess::{categorical_text, parse_numeric};
use crate::domain::model::{FeatureMatrix, Record, Table, CHURN_LABEL};
use crate::utils::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NUMERICAL_FEATURES: [&str; 3] = ["Tenure Months", "Monthly Charges", "Total Charges"];

pub const CATEGORICAL_FEATURES: [&str; 8] = [
    "Contract",
    "Internet Service",
    "Online Security",
    "Online Backup",
    "Device Protection",
    "Tech Support",
    "Payment Method",
    "Paperless Billing",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformers {
    pub feature_names: Vec<String>,
    pub encoders: BTreeMap<String, LabelEncoder>,
    pub medians: BTreeMap<String, f64>,
}

impl FeatureTransformers {
    /// Encodes one customer into a feature row, in `feature_names` order.
    pub fn transform_record(&self, record: &Record) -> Result<Vec<f64>> {
        self.feature_names
            .iter()
            .map(|name| {
                if let Some(encoder) = self.encoders.get(name) {
                    let text = categorical_text(record.data.get(name));
                    encoder
                        .transform_one(&text)
                        .map(|code| code as f64)
                        .ok_or_else(|| ChurnError::UnknownCategoryError {
                            column: name.clone(),
                            value: text,
                            known: encoder.classes().to_vec(),
                        })
                } else if let Some(median) = self.medians.get(name) {
                    Ok(record
                        .data
                        .get(name)
                        .and_then(parse_numeric)
                        .unwrap_or(*median))
                } else {
                    Err(ChurnError::ModelError {
                        message: format!("No transformer stored for feature '{}'", name),
                    })
                }
            })
            .collect()
    }
}

/// Builds the model inputs from a preprocessed table.
///
/// Features are the numeric columns followed by the categorical ones,
/// restricted to those present in `table`.
pub fn prepare_features(table: &Table) -> Result<(FeatureMatrix, FeatureTransformers)> {
    let numerical: Vec<&str> = NUMERICAL_FEATURES
        .iter()
        .copied()
        .filter(|f| table.has_column(f))
        .collect();
    let categorical: Vec<&str> = CATEGORICAL_FEATURES
        .iter()
        .copied()
        .filter(|f| table.has_column(f))
        .collect();

    if numerical.is_empty() && categorical.is_empty() {
        return Err(ChurnError::ProcessingError {
            message: format!(
                "None of the model features are present; expected some of: {}",
                NUMERICAL_FEATURES
                    .iter()
                    .chain(CATEGORICAL_FEATURES.iter())
                    .copied()
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    let mut transformers = FeatureTransformers::default();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(numerical.len() + categorical.len());

    for &feature in &numerical {
        let values: Vec<Option<f64>> = table
            .records
            .iter()
            .map(|r| r.data.get(feature).and_then(parse_numeric))
            .collect();
        let observed: Vec<f64> = values.iter().flatten().copied().collect();
        let fill = median(&observed).unwrap_or(0.0);

        tracing::debug!(
            "{}: {} missing value(s) filled with median {:.4}",
            feature,
            values.len() - observed.len(),
            fill
        );

        columns.push(values.into_iter().map(|v| v.unwrap_or(fill)).collect());
        transformers.medians.insert(feature.to_string(), fill);
        transformers.feature_names.push(feature.to_string());
    }

    for &feature in &categorical {
        let texts: Vec<String> = table
            .records
            .iter()
            .map(|r| categorical_text(r.data.get(feature)))
            .collect();
        let encoder = LabelEncoder::fit(&texts);

        let codes = texts
            .iter()
            .map(|t| encoder.transform_one(t).map(|c| c as f64).unwrap_or(0.0))
            .collect();

        tracing::debug!("{}: {} class(es)", feature, encoder.classes().len());

        columns.push(codes);
        transformers.encoders.insert(feature.to_string(), encoder);
        transformers.feature_names.push(feature.to_string());
    }

    let rows = (0..table.len())
        .map(|i| columns.iter().map(|col| col[i]).collect())
        .collect();

    Ok((
        FeatureMatrix {
            feature_names: transformers.feature_names.clone(),
            rows,
        },
        transformers,
    ))
}

/// Maps `Churn Label` to 1.0 (`Yes`) / 0.0 (`No`).
///
/// Rows with any other label cannot be used for training; their indices are
/// returned separately so callers can drop them from the feature matrix.
pub fn extract_target(table: &Table) -> Result<(Vec<f64>, Vec<usize>)> {
    if !table.has_column(CHURN_LABEL) {
        return Err(ChurnError::MissingColumnError {
            column: CHURN_LABEL.to_string(),
        });
    }

    let mut labels = Vec::with_capacity(table.len());
    let mut unlabeled = Vec::new();

    for (i, record) in table.records.iter().enumerate() {
        match record.get_str(CHURN_LABEL).map(str::trim) {
            Some("Yes") => labels.push(1.0),
            Some("No") => labels.push(0.0),
            _ => {
                labels.push(f64::NAN);
                unlabeled.push(i);
            }
        }
    }

    Ok((labels, unlabeled))
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
