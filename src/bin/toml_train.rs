use churn_pipeline::config::toml_config::TomlConfig;
use churn_pipeline::core::ConfigProvider;
use churn_pipeline::utils::error::ErrorSeverity;
use churn_pipeline::utils::{logger, validation::Validate};
use churn_pipeline::{LocalStorage, PipelineEngine, TrainingPipeline};
use clap::Parser;

#[derive(Parser)]
#[command(name = "toml-train")]
#[command(about = "Train a churn model from a TOML configuration")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "churn-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show what would be trained without executing
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based training");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    // 載入 TOML 配置
    let config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No training will occur");
        perform_dry_run(&config).await;
        return Ok(());
    }

    // 決定監控設定
    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(".".to_string());
    let pipeline = TrainingPipeline::new(storage, config);
    let engine = PipelineEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Training completed successfully!");
            println!("✅ Training completed successfully!");
            println!("📁 Model bundle saved to: {}", output_path);
        }
        Err(e) => {
            tracing::error!(
                "❌ Training failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig, args: &Args) {
    let params = config.model_params();

    println!("📋 Configuration Summary:");
    println!("  Pipeline: {} v{}", config.pipeline.name, config.pipeline.version);
    println!("  Input: {}", config.input_path());
    println!("  Models: {}", config.models_dir());
    println!("  Model: {} (seed {})", config.model_kind(), params.seed);
    println!(
        "  Split: test_size={}, cv_folds={}",
        config.test_size(),
        config.cv_folds()
    );

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

async fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    println!();

    // 輸入檔案檢查
    println!("📡 Data Source:");
    match tokio::fs::metadata(config.input_path()).await {
        Ok(meta) => println!("  ✅ {} ({} bytes)", config.input_path(), meta.len()),
        Err(e) => println!("  ❌ {} is not readable: {}", config.input_path(), e),
    }

    // 模型參數
    let params = config.model_params();
    println!();
    println!("⚙️ Model Parameters:");
    println!("  n_estimators: {}", params.n_estimators);
    println!("  max_depth: {}", params.max_depth);
    println!("  min_samples_split: {}", params.min_samples_split);
    println!("  min_samples_leaf: {}", params.min_samples_leaf);
    println!("  learning_rate: {}", params.learning_rate);

    println!();
    println!("💾 Outputs:");
    println!("  {}/churn_artifacts.zip", config.models_dir());
    println!("  {}/training_report.json", config.models_dir());

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during actual run.");
}
