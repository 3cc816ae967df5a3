//! The trained model bundle: model, scaler, feature transformers and
//! metadata, packed into a single zip archive.

use crate::core::features::FeatureTransformers;
use crate::core::scaler::StandardScaler;
use crate::models::{ChurnModel, Classifier, ModelKind, ModelParams};
use crate::utils::error::{ChurnError, Result};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const BUNDLE_FILENAME: &str = "churn_artifacts.zip";

const MODEL_ENTRY: &str = "model.json";
const SCALER_ENTRY: &str = "scaler.json";
const TRANSFORMERS_ENTRY: &str = "transformers.json";
const FEATURE_NAMES_ENTRY: &str = "feature_names.json";
const METADATA_ENTRY: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub model_kind: ModelKind,
    pub params: ModelParams,
    pub trained_at: DateTime<Utc>,
    pub n_train: usize,
    pub n_test: usize,
    pub crate_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifacts {
    pub model: ChurnModel,
    pub scaler: StandardScaler,
    pub transformers: FeatureTransformers,
    pub metadata: ArtifactMetadata,
}

impl ModelArtifacts {
    pub fn feature_names(&self) -> &[String] {
        &self.transformers.feature_names
    }

    /// Churn probability for a raw (preprocessed) feature row.
    pub fn predict_proba_row(&self, row: &[f64]) -> Result<f64> {
        let scaled = self.scaler.transform_one(row)?;
        self.model.predict_proba_one(&scaled)
    }

    pub fn to_zip_bytes(&self) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        let entries: [(&str, Vec<u8>); 5] = [
            (MODEL_ENTRY, serde_json::to_vec(&self.model)?),
            (SCALER_ENTRY, serde_json::to_vec_pretty(&self.scaler)?),
            (TRANSFORMERS_ENTRY, serde_json::to_vec_pretty(&self.transformers)?),
            (FEATURE_NAMES_ENTRY, serde_json::to_vec_pretty(self.feature_names())?),
            (METADATA_ENTRY, serde_json::to_vec_pretty(&self.metadata)?),
        ];

        for (name, bytes) in entries {
            zip.start_file(name, options)?;
            zip.write_all(&bytes)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn from_zip_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let artifacts = Self {
            model: read_entry(&mut archive, MODEL_ENTRY)?,
            scaler: read_entry(&mut archive, SCALER_ENTRY)?,
            transformers: read_entry(&mut archive, TRANSFORMERS_ENTRY)?,
            metadata: read_entry(&mut archive, METADATA_ENTRY)?,
        };

        let feature_names: Vec<String> = read_entry(&mut archive, FEATURE_NAMES_ENTRY)?;
        if feature_names != artifacts.transformers.feature_names {
            return Err(ChurnError::ModelError {
                message: "Bundle feature names do not match its transformers".to_string(),
            });
        }

        Ok(artifacts)
    }
}

fn read_entry<T: DeserializeOwned>(archive: &mut ZipArchive<Cursor<&[u8]>>, name: &str) -> Result<T> {
    let mut file = archive.by_name(name)?;
    let mut buf = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut buf)?;
    Ok(serde_json::from_slice(&buf)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::features::prepare_features;
    use crate::core::preprocess::preprocess_data;
    use crate::domain::model::{Dataset, Table};

    fn trained() -> (ModelArtifacts, Table) {
        let mut csv = String::from("Tenure Months,Monthly Charges,Contract,Churn Label\n");
        for i in 0..60 {
            let contract = if i % 2 == 0 { "Month-to-month" } else { "Two year" };
            let label = if i % 2 == 0 && i < 30 { "Yes" } else { "No" };
            csv.push_str(&format!("{},{}.5,{},{}\n", i, 20 + i, contract, label));
        }
        let table = preprocess_data(&Table::from_csv_bytes(csv.as_bytes()).unwrap());
        let (matrix, transformers) = prepare_features(&table).unwrap();
        let labels = table
            .records
            .iter()
            .map(|r| if r.get_str("Churn Label") == Some("Yes") { 1.0 } else { 0.0 })
            .collect();
        let mut dataset = Dataset::from_matrix(matrix, labels).unwrap();

        let mut scaler = StandardScaler::new();
        dataset.features = scaler.fit_transform(&dataset.features).unwrap();

        let params = ModelParams {
            n_estimators: 5,
            ..Default::default()
        };
        let mut model = ChurnModel::new(ModelKind::RandomForest, &params);
        model.fit(&dataset).unwrap();

        let artifacts = ModelArtifacts {
            model,
            scaler,
            transformers,
            metadata: ArtifactMetadata {
                model_kind: ModelKind::RandomForest,
                params,
                trained_at: Utc::now(),
                n_train: 60,
                n_test: 0,
                crate_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        (artifacts, table)
    }

    #[test]
    fn bundle_round_trip_predicts_identically() {
        let (artifacts, table) = trained();
        let bytes = artifacts.to_zip_bytes().unwrap();
        let restored = ModelArtifacts::from_zip_bytes(&bytes).unwrap();

        assert_eq!(restored.metadata, artifacts.metadata);
        assert_eq!(restored.feature_names(), artifacts.feature_names());

        for record in &table.records {
            let row = artifacts.transformers.transform_record(record).unwrap();
            assert_eq!(
                artifacts.predict_proba_row(&row).unwrap(),
                restored.predict_proba_row(&row).unwrap()
            );
        }
    }

    #[test]
    fn bundle_lists_expected_entries() {
        let (artifacts, _) = trained();
        let bytes = artifacts.to_zip_bytes().unwrap();
        let archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();

        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "feature_names.json",
                "metadata.json",
                "model.json",
                "scaler.json",
                "transformers.json"
            ]
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(ModelArtifacts::from_zip_bytes(b"not a zip").is_err());
    }
}
