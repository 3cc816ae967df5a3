use churn_pipeline::app::{predict, stages};
use churn_pipeline::config::cli::{Command, PredictArgs};
use churn_pipeline::core::ConfigProvider;
use churn_pipeline::utils::error::{ChurnError, ErrorSeverity};
use churn_pipeline::utils::{logger, validation::Validate};
use churn_pipeline::{CliConfig, LocalStorage, PipelineEngine, ScoringPipeline, TomlConfig, TrainingPipeline};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting churn-pipeline CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 合併並驗證配置
    let config = match cli.resolve().and_then(|config| config.validate().map(|_| config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let monitor_enabled = cli.monitor_enabled(&config);
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&cli.command, config, monitor_enabled).await {
        Ok(output_path) => {
            tracing::info!("✅ Completed successfully!");
            println!("✅ Completed successfully!");
            if let Some(path) = output_path {
                println!("📁 Output saved to: {}", path);
            }
        }
        Err(e) => exit_with(e),
    }

    Ok(())
}

/// Storage paths in the config are relative to the working directory.
async fn run(command: &Command, config: TomlConfig, monitor_enabled: bool) -> churn_pipeline::Result<Option<String>> {
    let storage = LocalStorage::new(".".to_string());

    match command {
        Command::Preprocess(_) => {
            stages::run_preprocess(&storage, config.input_path(), config.processed_dir())
                .await
                .map(Some)
        }
        Command::BuildFeatures(_) => {
            stages::run_build_features(&storage, config.input_path(), config.processed_dir())
                .await
                .map(Some)
        }
        Command::Train(_) => {
            let pipeline = TrainingPipeline::new(storage, config);
            let engine = PipelineEngine::new_with_monitoring(pipeline, monitor_enabled);
            engine.run().await.map(Some)
        }
        Command::Score(_) => {
            let pipeline = ScoringPipeline::new(storage, config);
            let engine = PipelineEngine::new_with_monitoring(pipeline, monitor_enabled);
            engine.run().await.map(Some)
        }
        Command::Predict(args) => {
            let artifacts = predict::load_artifacts(&storage, config.models_dir()).await?;
            let assessment = predict::assess_customer(&artifacts, &args.to_record())?;
            print_assessment(args, &assessment)?;
            Ok(None)
        }
        Command::Summarize(_) => {
            let (path, summary) =
                stages::run_summarize(&storage, config.input_path(), config.reports_dir()).await?;
            println!("📋 Executive Summary:");
            println!("  Total Customers: {}", summary.total_customers);
            println!("  Churn Rate: {:.1}%", summary.churn_rate_pct);
            if let Some(tenure) = summary.average_tenure_years {
                println!("  Avg Tenure: {:.1} years", tenure);
            }
            if let Some(charges) = summary.average_monthly_charges {
                println!("  Avg Monthly Charges: ${:.2}", charges);
            }
            for reason in &summary.top_churn_reasons {
                println!("  - {} ({})", reason.reason, reason.count);
            }
            for segment in &summary.churn_by_value_segment {
                println!(
                    "  {}: {} customers, {:.1}% churn",
                    segment.segment, segment.customers, segment.churn_rate_pct
                );
            }
            Ok(Some(path))
        }
    }
}

fn print_assessment(args: &PredictArgs, assessment: &predict::CustomerAssessment) -> churn_pipeline::Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(assessment)?);
        return Ok(());
    }

    println!("🎯 Churn Probability: {:.1}%", assessment.churn_probability * 100.0);
    println!("⚠️ Risk Level: {}", assessment.risk_level);
    if assessment.recommendations.is_empty() {
        println!("✅ No immediate action required");
    } else {
        println!("💡 Recommended Actions:");
        for action in &assessment.recommendations {
            println!("  - {}", action);
        }
    }
    Ok(())
}

fn exit_with(e: ChurnError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 可修正的輸入錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };
    std::process::exit(exit_code);
}
