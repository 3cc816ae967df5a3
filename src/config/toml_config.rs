use crate::core::ConfigProvider;
use crate::domain::model::CUSTOMER_ID;
use crate::models::{ModelKind, ModelParams};
use crate::utils::error::{ChurnError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_INPUT_PATH: &str = "data/telco_customer_churn.csv";
pub const DEFAULT_PROCESSED_DIR: &str = "data/processed";
pub const DEFAULT_MODELS_DIR: &str = "models";
pub const DEFAULT_REPORTS_DIR: &str = "reports";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    pub data: DataConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "telco-churn".to_string(),
            description: "Customer churn prediction".to_string(),
            version: default_version(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub input_path: String,
    /// Column copied into scoring output to identify customers
    #[serde(default = "default_id_column")]
    pub id_column: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            input_path: DEFAULT_INPUT_PATH.to_string(),
            id_column: default_id_column(),
        }
    }
}

/// Overrides on top of [`ModelParams::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub kind: ModelKind,
    pub n_estimators: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: Option<usize>,
    pub min_samples_leaf: Option<usize>,
    pub max_features: Option<usize>,
    pub learning_rate: Option<f64>,
    pub boosting_max_depth: Option<usize>,
    pub max_iter: Option<usize>,
    pub l2_penalty: Option<f64>,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            cv_folds: default_cv_folds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_processed_dir")]
    pub processed_dir: String,
    #[serde(default = "default_models_dir")]
    pub models_dir: String,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
            models_dir: default_models_dir(),
            reports_dir: default_reports_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_id_column() -> Option<String> {
    Some(CUSTOMER_ID.to_string())
}

fn default_version() -> String {
    "1.0.0".to_string()
}

fn default_test_size() -> f64 {
    0.2
}

fn default_cv_folds() -> usize {
    5
}

fn default_processed_dir() -> String {
    DEFAULT_PROCESSED_DIR.to_string()
}

fn default_models_dir() -> String {
    DEFAULT_MODELS_DIR.to_string()
}

fn default_reports_dir() -> String {
    DEFAULT_REPORTS_DIR.to_string()
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ChurnError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ChurnError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ChurnError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("pipeline.name", &self.pipeline.name)?;

        // 輸入檔案
        validation::validate_path("data.input_path", &self.data.input_path)?;
        validation::validate_file_extensions("data.input_path", &[self.data.input_path.as_str()], &["csv"])?;
        if let Some(id_column) = &self.data.id_column {
            validation::validate_non_empty_string("data.id_column", id_column)?;
        }

        // 輸出目錄
        validation::validate_path("output.processed_dir", &self.output.processed_dir)?;
        validation::validate_path("output.models_dir", &self.output.models_dir)?;
        validation::validate_path("output.reports_dir", &self.output.reports_dir)?;

        // 模型參數
        let params = self.model_params();
        validation::validate_positive_number("model.n_estimators", params.n_estimators, 1)?;
        validation::validate_positive_number("model.max_depth", params.max_depth, 1)?;
        validation::validate_positive_number("model.min_samples_split", params.min_samples_split, 2)?;
        validation::validate_positive_number("model.min_samples_leaf", params.min_samples_leaf, 1)?;
        validation::validate_positive_number("model.boosting_max_depth", params.boosting_max_depth, 1)?;
        validation::validate_positive_number("model.max_iter", params.max_iter, 1)?;
        if let Some(max_features) = params.max_features {
            validation::validate_positive_number("model.max_features", max_features, 1)?;
        }
        validation::validate_range("model.learning_rate", params.learning_rate, 1e-6, 1.0)?;
        if params.l2_penalty < 0.0 || !params.l2_penalty.is_finite() {
            return Err(ChurnError::InvalidConfigValueError {
                field: "model.l2_penalty".to_string(),
                value: params.l2_penalty.to_string(),
                reason: "Penalty must be a non-negative number".to_string(),
            });
        }

        // 切分設定
        validation::validate_range("split.test_size", self.split.test_size, 0.01, 0.99)?;
        if self.split.cv_folds == 1 {
            return Err(ChurnError::InvalidConfigValueError {
                field: "split.cv_folds".to_string(),
                value: "1".to_string(),
                reason: "Use 0 to disable cross-validation or at least 2 folds".to_string(),
            });
        }

        Ok(())
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn processed_dir(&self) -> &str {
        &self.output.processed_dir
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.data.input_path
    }

    fn models_dir(&self) -> &str {
        &self.output.models_dir
    }

    fn reports_dir(&self) -> &str {
        &self.output.reports_dir
    }

    fn id_column(&self) -> Option<&str> {
        self.data.id_column.as_deref()
    }

    fn model_kind(&self) -> ModelKind {
        self.model.kind
    }

    fn model_params(&self) -> ModelParams {
        let defaults = ModelParams::default();
        let m = &self.model;
        ModelParams {
            n_estimators: m.n_estimators.unwrap_or(defaults.n_estimators),
            max_depth: m.max_depth.unwrap_or(defaults.max_depth),
            min_samples_split: m.min_samples_split.unwrap_or(defaults.min_samples_split),
            min_samples_leaf: m.min_samples_leaf.unwrap_or(defaults.min_samples_leaf),
            max_features: m.max_features.or(defaults.max_features),
            learning_rate: m.learning_rate.unwrap_or(defaults.learning_rate),
            boosting_max_depth: m.boosting_max_depth.unwrap_or(defaults.boosting_max_depth),
            max_iter: m.max_iter.unwrap_or(defaults.max_iter),
            l2_penalty: m.l2_penalty.unwrap_or(defaults.l2_penalty),
            seed: m.seed.unwrap_or(defaults.seed),
        }
    }

    fn test_size(&self) -> f64 {
        self.split.test_size
    }

    fn cv_folds(&self) -> usize {
        self.split.cv_folds
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[pipeline]
name = "telco-churn"
description = "Churn model training"
version = "2.0.0"

[data]
input_path = "data/telco.csv"
id_column = "CustomerID"

[model]
kind = "xgboost"
n_estimators = 50
learning_rate = 0.05
seed = 7

[split]
test_size = 0.25
cv_folds = 3

[output]
models_dir = "out/models"

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.version, "2.0.0");
        assert_eq!(config.input_path(), "data/telco.csv");
        assert_eq!(config.id_column(), Some("CustomerID"));
        assert_eq!(config.model_kind(), ModelKind::GradientBoosting);
        assert_eq!(config.models_dir(), "out/models");
        assert_eq!(config.reports_dir(), DEFAULT_REPORTS_DIR);
        assert_eq!(config.test_size(), 0.25);
        assert_eq!(config.cv_folds(), 3);
        assert!(config.monitoring_enabled());

        let params = config.model_params();
        assert_eq!(params.n_estimators, 50);
        assert_eq!(params.learning_rate, 0.05);
        assert_eq!(params.seed, 7);
        assert_eq!(params.max_depth, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("[data]\ninput_path = \"telco.csv\"\n").unwrap();

        assert_eq!(config.model_kind(), ModelKind::RandomForest);
        assert_eq!(config.model_params(), ModelParams::default());
        assert_eq!(config.test_size(), 0.2);
        assert_eq!(config.cv_folds(), 5);
        assert_eq!(config.processed_dir(), DEFAULT_PROCESSED_DIR);
        assert_eq!(config.id_column(), Some("CustomerID"));
        assert_eq!(config.data, DataConfig::default());
        assert!(!config.monitoring_enabled());
    }

    #[test]
    fn test_monitoring_section_only_toggles_monitoring() {
        // log_level is not part of the monitoring section; the logger reads RUST_LOG
        let toml_content = "[data]\ninput_path = \"a.csv\"\n\n[monitoring]\nenabled = true\nlog_level = \"debug\"\n";
        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.monitoring, Some(MonitoringConfig { enabled: true }));
        assert!(config.monitoring_enabled());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CHURN_TEST_DATA_DIR", "/srv/telco");

        let toml_content = r#"
[data]
input_path = "${CHURN_TEST_DATA_DIR}/customers.csv"

[output]
reports_dir = "${CHURN_TEST_UNSET_VAR}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input_path(), "/srv/telco/customers.csv");
        assert_eq!(config.reports_dir(), "${CHURN_TEST_UNSET_VAR}");

        std::env::remove_var("CHURN_TEST_DATA_DIR");
    }

    #[test]
    fn test_config_validation() {
        let mut config = TomlConfig::default();
        assert!(config.validate().is_ok());

        config.data.input_path = "telco.xlsx".to_string();
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.split.cv_folds = 1;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.split.test_size = 1.0;
        assert!(config.validate().is_err());

        let mut config = TomlConfig::default();
        config.model.min_samples_split = Some(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_model_kind_is_rejected() {
        let err = TomlConfig::from_toml_str("[data]\ninput_path = \"a.csv\"\n[model]\nkind = \"svm\"\n")
            .unwrap_err();
        assert!(matches!(err, ChurnError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_model_kind_accepts_command_line_spellings() {
        for (kind, expected) in [
            ("random-forest", ModelKind::RandomForest),
            ("rf", ModelKind::RandomForest),
            ("Gradient-Boosting", ModelKind::GradientBoosting),
            ("logistic_regression", ModelKind::Logistic),
        ] {
            let toml_content = format!("[data]\ninput_path = \"a.csv\"\n[model]\nkind = \"{}\"\n", kind);
            let config = TomlConfig::from_toml_str(&toml_content).unwrap();
            assert_eq!(config.model_kind(), expected, "{}", kind);
        }
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[pipeline]\nname = \"file-test\"\n\n[data]\ninput_path = \"x.csv\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
        assert_eq!(config.pipeline.version, "1.0.0");
    }
}
