//! Single-customer risk assessment against a stored model bundle.

use crate::app::pipelines::output_path;
use crate::core::artifacts::{ModelArtifacts, BUNDLE_FILENAME};
use crate::core::preprocess::preprocess_data;
use crate::core::risk::{recommendations, RiskLevel};
use crate::core::{Record, Storage, Table};
use crate::utils::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAssessment {
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

pub async fn load_artifacts<S: Storage>(storage: &S, models_dir: &str) -> Result<ModelArtifacts> {
    let path = output_path(models_dir, BUNDLE_FILENAME);
    tracing::debug!("Loading model bundle from {}", path);

    let bytes = storage.read_file(&path).await.map_err(|e| match e {
        ChurnError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            ChurnError::ModelError {
                message: format!("No trained model at '{}'", path),
            }
        }
        other => other,
    })?;

    let artifacts = ModelArtifacts::from_zip_bytes(&bytes)?;
    tracing::info!(
        "Loaded {} model trained at {}",
        artifacts.metadata.model_kind,
        artifacts.metadata.trained_at
    );
    Ok(artifacts)
}

/// Churn probability of an already preprocessed record.
pub fn churn_probability(artifacts: &ModelArtifacts, processed: &Record) -> Result<f64> {
    let row = artifacts.transformers.transform_record(processed)?;
    artifacts.predict_proba_row(&row)
}

/// Preprocesses a raw customer record and assesses it.
pub fn assess_customer(artifacts: &ModelArtifacts, customer: &Record) -> Result<CustomerAssessment> {
    let mut columns: Vec<String> = customer.data.keys().cloned().collect();
    columns.sort();
    let mut table = Table::new(columns);
    table.records.push(customer.clone());

    let processed = preprocess_data(&table);
    let record = &processed.records[0];
    let probability = churn_probability(artifacts, record)?;

    Ok(CustomerAssessment {
        churn_probability: probability,
        risk_level: RiskLevel::from_probability(probability),
        recommendations: recommendations(record).iter().map(|r| r.to_string()).collect(),
    })
}
