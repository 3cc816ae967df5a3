use crate::app::pipelines::output_path;
use crate::app::predict::{churn_probability, load_artifacts};
use crate::core::preprocess::preprocess_data;
use crate::core::risk::{recommendations, risk_categories, Recommendation, RiskCategory, RiskLevel};
use crate::core::{ConfigProvider, Pipeline, Storage, Table};
use crate::domain::model::value_to_text;
use crate::utils::error::{ChurnError, Result};

pub const SCORED_FILENAME: &str = "scored_customers.csv";

/// Column used in the output when no id column is configured or present.
const ROW_COLUMN: &str = "row";

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCustomer {
    /// Value of the id column, or the 1-based input row number
    pub id: String,
    pub churn_probability: f64,
    pub risk_level: RiskLevel,
    pub risk_category: RiskCategory,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredBatch {
    pub id_column: String,
    pub customers: Vec<ScoredCustomer>,
    pub skipped: usize,
}

/// Scores a batch of customers with the bundle found in the models directory.
pub struct ScoringPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ScoringPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ScoringPipeline<S, C> {
    type Output = ScoredBatch;

    async fn extract(&self) -> Result<Table> {
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        Table::from_csv_bytes(&bytes)
    }

    async fn transform(&self, data: Table) -> Result<ScoredBatch> {
        let artifacts = load_artifacts(&self.storage, self.config.models_dir()).await?;
        let processed = preprocess_data(&data);

        let id_column = self
            .config
            .id_column()
            .filter(|c| processed.has_column(c))
            .map(str::to_string);

        let mut scored = Vec::with_capacity(processed.len());
        let mut first_error = None;
        let mut skipped = 0;

        for (i, record) in processed.records.iter().enumerate() {
            match churn_probability(&artifacts, record) {
                Ok(p) => {
                    let id = id_column
                        .as_deref()
                        .and_then(|c| record.data.get(c))
                        .and_then(value_to_text)
                        .unwrap_or_else(|| (i + 1).to_string());
                    scored.push((id, p, recommendations(record)));
                }
                Err(e) => {
                    tracing::warn!("Skipping row {}: {}", i + 1, e);
                    skipped += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        if scored.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }
        if skipped > 0 {
            tracing::warn!("{} of {} record(s) could not be scored", skipped, processed.len());
        }

        let probabilities: Vec<f64> = scored.iter().map(|(_, p, _)| *p).collect();
        let categories = risk_categories(&probabilities);

        let customers = scored
            .into_iter()
            .zip(categories)
            .map(|((id, p, actions), category)| ScoredCustomer {
                id,
                churn_probability: p,
                risk_level: RiskLevel::from_probability(p),
                risk_category: category,
                recommendations: actions,
            })
            .collect::<Vec<_>>();

        let high = customers.iter().filter(|c| c.risk_level == RiskLevel::High).count();
        tracing::info!("Scored {} customer(s), {} at high risk", customers.len(), high);

        Ok(ScoredBatch {
            id_column: id_column.unwrap_or_else(|| ROW_COLUMN.to_string()),
            customers,
            skipped,
        })
    }

    async fn load(&self, result: ScoredBatch) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record([
            result.id_column.as_str(),
            "churn_probability",
            "risk_level",
            "risk_category",
            "recommendations",
        ])?;

        for customer in &result.customers {
            let actions = customer
                .recommendations
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            writer.write_record([
                customer.id.clone(),
                format!("{:.6}", customer.churn_probability),
                customer.risk_level.to_string(),
                customer.risk_category.to_string(),
                actions,
            ])?;
        }

        let bytes = writer.into_inner().map_err(|e| ChurnError::ProcessingError {
            message: format!("Failed to finish scored CSV: {}", e),
        })?;

        let path = output_path(self.config.reports_dir(), SCORED_FILENAME);
        self.storage.write_file(&path, &bytes).await?;
        Ok(path)
    }
}
