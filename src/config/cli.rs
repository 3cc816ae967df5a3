use crate::config::toml_config::TomlConfig;
use crate::domain::model::Record;
use crate::models::ModelKind;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Args, Parser, Subcommand};
use serde_json::json;

#[derive(Debug, Clone, Parser)]
#[command(name = "churn-pipeline")]
#[command(version, about = "Customer churn prediction: preprocessing, training and risk scoring")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; command-line options take precedence
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Clean the raw customer table and write processed.csv
    Preprocess(StageArgs),
    /// Encode features and write features.csv plus transformers.json
    BuildFeatures(StageArgs),
    /// Train a churn model and write the artifact bundle
    Train(TrainArgs),
    /// Score a batch of customers with a trained model
    Score(ScoreArgs),
    /// Assess a single customer
    Predict(PredictArgs),
    /// Write executive-summary KPIs for a customer table
    Summarize(SummarizeArgs),
}

#[derive(Debug, Clone, Args)]
pub struct StageArgs {
    /// Raw customer CSV
    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TrainArgs {
    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(long)]
    pub models_dir: Option<String>,

    /// logistic, random_forest or gradient_boosting (alias xgboost)
    #[arg(short, long)]
    pub model: Option<ModelKind>,

    #[arg(long)]
    pub n_estimators: Option<usize>,

    #[arg(long)]
    pub max_depth: Option<usize>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    #[arg(long)]
    pub test_size: Option<f64>,

    /// 0 disables cross-validation
    #[arg(long)]
    pub cv_folds: Option<usize>,

    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Args)]
pub struct ScoreArgs {
    /// Customer batch CSV
    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(long)]
    pub models_dir: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<String>,

    #[arg(long)]
    pub id_column: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct PredictArgs {
    #[arg(long)]
    pub models_dir: Option<String>,

    #[arg(long, default_value_t = 60.0)]
    pub tenure_months: f64,

    #[arg(long, default_value_t = 100.0)]
    pub monthly_charges: f64,

    #[arg(long, default_value_t = 1000.0)]
    pub total_charges: f64,

    #[arg(long, default_value = "Month-to-month")]
    pub contract: String,

    #[arg(long, default_value = "DSL")]
    pub internet_service: String,

    #[arg(long, default_value = "Yes")]
    pub online_security: String,

    #[arg(long, default_value = "Yes")]
    pub online_backup: String,

    #[arg(long, default_value = "Yes")]
    pub device_protection: String,

    #[arg(long, default_value = "Yes")]
    pub tech_support: String,

    #[arg(long, default_value = "Electronic check")]
    pub payment_method: String,

    #[arg(long, default_value = "Yes")]
    pub paperless_billing: String,

    /// Print the assessment as JSON
    #[arg(long)]
    pub json: bool,
}

impl PredictArgs {
    pub fn to_record(&self) -> Record {
        let mut record = Record::default();
        record.set("Tenure Months", json!(self.tenure_months));
        record.set("Monthly Charges", json!(self.monthly_charges));
        record.set("Total Charges", json!(self.total_charges));
        record.set("Contract", json!(self.contract));
        record.set("Internet Service", json!(self.internet_service));
        record.set("Online Security", json!(self.online_security));
        record.set("Online Backup", json!(self.online_backup));
        record.set("Device Protection", json!(self.device_protection));
        record.set("Tech Support", json!(self.tech_support));
        record.set("Payment Method", json!(self.payment_method));
        record.set("Paperless Billing", json!(self.paperless_billing));
        record
    }
}

#[derive(Debug, Clone, Args)]
pub struct SummarizeArgs {
    #[arg(short, long)]
    pub input: Option<String>,

    #[arg(short, long)]
    pub output_dir: Option<String>,
}

impl CliConfig {
    /// 合併 TOML 檔案 (或預設值) 與命令列覆蓋設定
    pub fn resolve(&self) -> Result<TomlConfig> {
        let mut config = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };

        match &self.command {
            Command::Preprocess(args) | Command::BuildFeatures(args) => {
                override_with(&mut config.data.input_path, &args.input);
                override_with(&mut config.output.processed_dir, &args.output_dir);
            }
            Command::Train(args) => {
                override_with(&mut config.data.input_path, &args.input);
                override_with(&mut config.output.models_dir, &args.models_dir);
                if let Some(kind) = args.model {
                    config.model.kind = kind;
                }
                config.model.n_estimators = args.n_estimators.or(config.model.n_estimators);
                config.model.max_depth = args.max_depth.or(config.model.max_depth);
                config.model.learning_rate = args.learning_rate.or(config.model.learning_rate);
                config.model.seed = args.seed.or(config.model.seed);
                if let Some(test_size) = args.test_size {
                    config.split.test_size = test_size;
                }
                if let Some(cv_folds) = args.cv_folds {
                    config.split.cv_folds = cv_folds;
                }
            }
            Command::Score(args) => {
                override_with(&mut config.data.input_path, &args.input);
                override_with(&mut config.output.models_dir, &args.models_dir);
                override_with(&mut config.output.reports_dir, &args.output_dir);
                if args.id_column.is_some() {
                    config.data.id_column = args.id_column.clone();
                }
            }
            Command::Predict(args) => {
                override_with(&mut config.output.models_dir, &args.models_dir);
            }
            Command::Summarize(args) => {
                override_with(&mut config.data.input_path, &args.input);
                override_with(&mut config.output.reports_dir, &args.output_dir);
            }
        }

        Ok(config)
    }

    pub fn monitor_enabled(&self, config: &TomlConfig) -> bool {
        self.monitor || config.monitoring_enabled()
    }
}

fn override_with(target: &mut String, value: &Option<String>) {
    if let Some(value) = value {
        *target = value.clone();
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        self.resolve()?.validate()
    }
}
