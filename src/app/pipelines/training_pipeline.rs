use crate::app::pipelines::output_path;
use crate::core::artifacts::BUNDLE_FILENAME;
use crate::core::training::{train_from_table, TrainingResult, TrainingSettings};
use crate::core::{ConfigProvider, Pipeline, Storage, Table};
use crate::utils::error::{ChurnError, Result};

pub const REPORT_FILENAME: &str = "training_report.json";

/// Reads the raw customer CSV, trains the configured model and stores the
/// artifact bundle plus an evaluation report in the models directory.
pub struct TrainingPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> TrainingPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    pub fn settings(&self) -> TrainingSettings {
        TrainingSettings::from_config(&self.config)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for TrainingPipeline<S, C> {
    type Output = TrainingResult;

    async fn extract(&self) -> Result<Table> {
        tracing::debug!("Reading training data from {}", self.config.input_path());
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        let table = Table::from_csv_bytes(&bytes)?;

        if table.is_empty() {
            return Err(ChurnError::ValidationError {
                message: format!("'{}' contains no customer records", self.config.input_path()),
            });
        }

        Ok(table)
    }

    async fn transform(&self, data: Table) -> Result<TrainingResult> {
        let settings = self.settings();
        tracing::debug!("Training settings: {:?}", settings);

        // 模型訓練是 CPU 密集工作，移到 blocking 執行緒
        tokio::task::spawn_blocking(move || train_from_table(&data, &settings))
            .await
            .map_err(|e| ChurnError::ProcessingError {
                message: format!("Training task failed: {}", e),
            })?
    }

    async fn load(&self, result: TrainingResult) -> Result<String> {
        let models_dir = self.config.models_dir();

        let bundle = result.artifacts.to_zip_bytes()?;
        let bundle_path = output_path(models_dir, BUNDLE_FILENAME);
        tracing::debug!("Writing model bundle ({} bytes) to storage", bundle.len());
        self.storage.write_file(&bundle_path, &bundle).await?;

        let report_path = output_path(models_dir, REPORT_FILENAME);
        let report = serde_json::to_vec_pretty(&result.report)?;
        self.storage.write_file(&report_path, &report).await?;

        tracing::info!("Model Training Score: {:.4}", result.report.train_score);
        tracing::info!("Model Test Score: {:.4}", result.report.test_score);
        tracing::info!("Evaluation report saved to {}", report_path);

        Ok(bundle_path)
    }
}
