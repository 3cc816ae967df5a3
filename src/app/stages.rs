//! Standalone stage commands: preprocessing, feature building and the
//! executive summary.

use crate::app::pipelines::output_path;
use crate::core::features::{extract_target, prepare_features};
use crate::core::preprocess::preprocess_data;
use crate::core::summary::{summarize, ExecutiveSummary};
use crate::core::{Storage, Table};
use crate::utils::error::{ChurnError, Result};

pub const PROCESSED_FILENAME: &str = "processed.csv";
pub const FEATURES_FILENAME: &str = "features.csv";
pub const TRANSFORMERS_FILENAME: &str = "transformers.json";
pub const SUMMARY_FILENAME: &str = "executive_summary.json";
pub const TARGET_COLUMN: &str = "Churn";

async fn read_table<S: Storage>(storage: &S, input: &str) -> Result<Table> {
    let bytes = storage.read_file(input).await?;
    let table = Table::from_csv_bytes(&bytes)?;
    tracing::info!("Read {} record(s) with {} column(s) from {}", table.len(), table.columns.len(), input);
    Ok(table)
}

/// Writes the cleaned table as `processed.csv`; returns its path.
pub async fn run_preprocess<S: Storage>(storage: &S, input: &str, output_dir: &str) -> Result<String> {
    let raw = read_table(storage, input).await?;
    let processed = preprocess_data(&raw);

    let path = output_path(output_dir, PROCESSED_FILENAME);
    storage.write_file(&path, &processed.to_csv_bytes()?).await?;
    tracing::info!("Processed data saved to {}", path);
    Ok(path)
}

/// Writes the encoded feature matrix (plus the `Churn` target when the
/// input carries churn labels) and the fitted transformers.
pub async fn run_build_features<S: Storage>(storage: &S, input: &str, output_dir: &str) -> Result<String> {
    let processed = preprocess_data(&read_table(storage, input).await?);
    let (matrix, transformers) = prepare_features(&processed)?;

    let target = match extract_target(&processed) {
        Ok((labels, unlabeled)) => {
            if !unlabeled.is_empty() {
                tracing::warn!("{} record(s) have no churn label", unlabeled.len());
            }
            Some(labels)
        }
        Err(ChurnError::MissingColumnError { column }) => {
            tracing::warn!("No '{}' column; writing features without a target", column);
            None
        }
        Err(e) => return Err(e),
    };

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = matrix.feature_names.clone();
    if target.is_some() {
        header.push(TARGET_COLUMN.to_string());
    }
    writer.write_record(&header)?;

    for (i, row) in matrix.rows.iter().enumerate() {
        let mut cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        if let Some(labels) = &target {
            cells.push(if labels[i].is_nan() {
                String::new()
            } else {
                (labels[i] as u8).to_string()
            });
        }
        writer.write_record(&cells)?;
    }

    let csv_bytes = writer.into_inner().map_err(|e| ChurnError::ProcessingError {
        message: format!("Failed to finish features CSV: {}", e),
    })?;

    let features_path = output_path(output_dir, FEATURES_FILENAME);
    storage.write_file(&features_path, &csv_bytes).await?;
    storage
        .write_file(
            &output_path(output_dir, TRANSFORMERS_FILENAME),
            &serde_json::to_vec_pretty(&transformers)?,
        )
        .await?;

    tracing::info!(
        "Wrote {} row(s) x {} feature(s) to {}",
        matrix.rows.len(),
        matrix.feature_names.len(),
        features_path
    );
    Ok(features_path)
}

/// Computes the executive summary and writes it as JSON.
pub async fn run_summarize<S: Storage>(
    storage: &S,
    input: &str,
    reports_dir: &str,
) -> Result<(String, ExecutiveSummary)> {
    let processed = preprocess_data(&read_table(storage, input).await?);
    let summary = summarize(&processed);

    let path = output_path(reports_dir, SUMMARY_FILENAME);
    storage.write_file(&path, &serde_json::to_vec_pretty(&summary)?).await?;
    tracing::info!("Executive summary saved to {}", path);
    Ok((path, summary))
}
