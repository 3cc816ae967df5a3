//! End-to-end model fitting on a raw customer table.

use crate::core::artifacts::{ArtifactMetadata, ModelArtifacts};
use crate::core::features::{extract_target, prepare_features};
use crate::core::metrics::{self, ClassificationMetrics, CrossValidation};
use crate::core::preprocess::preprocess_data;
use crate::core::scaler::StandardScaler;
use crate::core::split::train_test_split;
use crate::domain::model::{Dataset, FeatureMatrix, Table};
use crate::domain::ports::ConfigProvider;
use crate::models::{ChurnModel, Classifier, ModelKind, ModelParams};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSettings {
    pub model_kind: ModelKind,
    pub params: ModelParams,
    pub test_size: f64,
    /// 0 disables cross-validation
    pub cv_folds: usize,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::default(),
            params: ModelParams::default(),
            test_size: 0.2,
            cv_folds: 5,
        }
    }
}

impl TrainingSettings {
    pub fn from_config<C: ConfigProvider>(config: &C) -> Self {
        Self {
            model_kind: config.model_kind(),
            params: config.model_params(),
            test_size: config.test_size(),
            cv_folds: config.cv_folds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub model_kind: ModelKind,
    pub generated_at: DateTime<Utc>,
    pub n_samples: usize,
    pub n_unlabeled_dropped: usize,
    pub churn_rate: f64,
    pub train_score: f64,
    pub test_score: f64,
    pub train: ClassificationMetrics,
    pub test: ClassificationMetrics,
    pub cross_validation: Option<CrossValidation>,
    /// Sorted by importance, highest first
    pub feature_importances: Vec<FeatureImportance>,
}

pub struct TrainingResult {
    pub artifacts: ModelArtifacts,
    pub report: EvaluationReport,
}

/// Preprocesses `raw`, encodes features, holds out a test split, scales,
/// fits the configured model and evaluates it.
pub fn train_from_table(raw: &Table, settings: &TrainingSettings) -> Result<TrainingResult> {
    tracing::info!("Preprocessing {} record(s)...", raw.len());
    let df = preprocess_data(raw);

    tracing::info!("Preparing features...");
    let (matrix, transformers) = prepare_features(&df)?;
    let (labels, unlabeled) = extract_target(&df)?;

    let dataset = if unlabeled.is_empty() {
        Dataset::from_matrix(matrix, labels)?
    } else {
        tracing::warn!(
            "Dropping {} record(s) without a Yes/No churn label",
            unlabeled.len()
        );
        let keep: Vec<usize> = (0..labels.len())
            .filter(|i| unlabeled.binary_search(i).is_err())
            .collect();
        let matrix = FeatureMatrix {
            feature_names: matrix.feature_names,
            rows: keep.iter().map(|&i| matrix.rows[i].clone()).collect(),
        };
        Dataset::from_matrix(matrix, keep.iter().map(|&i| labels[i]).collect())?
    };

    tracing::info!(
        "Feature shape: ({}, {}), target shape: ({},)",
        dataset.n_samples(),
        dataset.n_features(),
        dataset.labels.len()
    );

    let positives = dataset.positive_count();
    if positives == 0 || positives == dataset.n_samples() {
        tracing::warn!("Training data contains a single class; metrics will be degenerate");
    }

    tracing::info!("Splitting data (test_size={})...", settings.test_size);
    let split = train_test_split(&dataset, settings.test_size, settings.params.seed)?;
    let mut train = split.train;
    let mut test = split.test;

    tracing::info!("Scaling features...");
    let mut scaler = StandardScaler::new();
    train.features = scaler.fit_transform(&train.features)?;
    test.features = scaler.transform(&test.features)?;

    tracing::info!("Training {} model...", settings.model_kind);
    let mut model = ChurnModel::new(settings.model_kind, &settings.params);
    model.fit(&train)?;

    let train_metrics = metrics::evaluate(&model, &train)?;
    let test_metrics = metrics::evaluate(&model, &test)?;
    tracing::info!("Model Training Score: {:.4}", train_metrics.accuracy);
    tracing::info!("Model Test Score: {:.4}", test_metrics.accuracy);

    let cross_validation = if settings.cv_folds >= 2 {
        tracing::info!("Running {}-fold cross-validation...", settings.cv_folds);
        let cv = metrics::cross_val_score(
            settings.model_kind,
            &settings.params,
            &dataset,
            settings.cv_folds,
            settings.params.seed,
        )?;
        tracing::info!("CV accuracy: {:.4} (+/- {:.4})", cv.mean, cv.std);
        Some(cv)
    } else {
        None
    };

    let mut feature_importances: Vec<FeatureImportance> = dataset
        .feature_names
        .iter()
        .zip(model.feature_importances())
        .map(|(feature, importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();
    feature_importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

    let report = EvaluationReport {
        model_kind: settings.model_kind,
        generated_at: Utc::now(),
        n_samples: dataset.n_samples(),
        n_unlabeled_dropped: unlabeled.len(),
        churn_rate: positives as f64 / dataset.n_samples().max(1) as f64,
        train_score: train_metrics.accuracy,
        test_score: test_metrics.accuracy,
        train: train_metrics,
        test: test_metrics,
        cross_validation,
        feature_importances,
    };

    let artifacts = ModelArtifacts {
        model,
        scaler,
        transformers,
        metadata: ArtifactMetadata {
            model_kind: settings.model_kind,
            params: settings.params.clone(),
            trained_at: report.generated_at,
            n_train: train.n_samples(),
            n_test: test.n_samples(),
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    Ok(TrainingResult { artifacts, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ChurnError;

    fn telco_like(n: usize) -> Table {
        let mut csv = String::from(
            "CustomerID,Tenure Months,Monthly Charges,Total Charges,Contract,Internet Service,Churn Value\n",
        );
        for i in 0..n {
            let tenure = i % 72;
            let contract = ["Month-to-month", "One year", "Two year"][i % 3];
            let internet = ["DSL", "Fiber optic", "No"][(i / 3) % 3];
            let churn = usize::from(contract == "Month-to-month" && tenure < 24);
            let monthly = 20.0 + (i % 80) as f64;
            csv.push_str(&format!(
                "{:04},{},${:.2},\"{:.2}\",{},{},{}\n",
                i,
                tenure,
                monthly,
                monthly * tenure as f64,
                contract,
                internet,
                churn
            ));
        }
        Table::from_csv_bytes(csv.as_bytes()).unwrap()
    }

    #[test]
    fn trains_and_evaluates_random_forest() {
        let settings = TrainingSettings {
            params: ModelParams {
                n_estimators: 20,
                ..Default::default()
            },
            cv_folds: 3,
            ..Default::default()
        };
        let result = train_from_table(&telco_like(300), &settings).unwrap();

        let report = &result.report;
        assert_eq!(report.n_samples, 300);
        assert!(report.test_score > 0.85, "test score {}", report.test_score);
        assert!(report.test.roc_auc > 0.9);
        assert_eq!(report.cross_validation.as_ref().unwrap().scores.len(), 3);
        assert_eq!(report.feature_importances.len(), 5);
        assert!(report.feature_importances[0].importance >= report.feature_importances[4].importance);

        assert_eq!(result.artifacts.metadata.n_test, 60);
        assert_eq!(result.artifacts.metadata.n_train, 240);
        assert_eq!(
            result.artifacts.feature_names(),
            &["Tenure Months", "Monthly Charges", "Total Charges", "Contract", "Internet Service"]
        );
    }

    #[test]
    fn drops_rows_without_labels() {
        let mut table = telco_like(100);
        table.records[3].set("Churn Value", serde_json::Value::Null);
        table.records[7].set("Churn Value", serde_json::json!("maybe"));

        let settings = TrainingSettings {
            model_kind: ModelKind::Logistic,
            cv_folds: 0,
            ..Default::default()
        };
        let result = train_from_table(&table, &settings).unwrap();
        assert_eq!(result.report.n_samples, 98);
        assert_eq!(result.report.n_unlabeled_dropped, 2);
        assert!(result.report.cross_validation.is_none());
    }

    #[test]
    fn requires_a_churn_column() {
        let table = Table::from_csv_bytes(b"Tenure Months,Contract\n1,One year\n2,Two year\n").unwrap();
        let err = train_from_table(&table, &TrainingSettings::default()).err().unwrap();
        assert!(matches!(err, ChurnError::MissingColumnError { .. }));
    }
}
