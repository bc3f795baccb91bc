use campaign_etl::config::{AnalyticsArgs, Command, MailchimpArgs};
use campaign_etl::utils::error::{ErrorSeverity, EtlError};
use campaign_etl::utils::{logger, validation::Validate};
use campaign_etl::{
    AnalyticsPipeline, Artifact, CliConfig, EtlEngine, LocalStorage, MailchimpPipeline, RunContext,
    Settings, TokioPacer,
};
use clap::Parser;
use std::sync::Arc;

async fn run_mailchimp(args: &MailchimpArgs, settings: &Settings) -> Result<Artifact, EtlError> {
    let context = RunContext::new("mailchimp");
    let storage = LocalStorage::new(settings.output.directory.clone());
    let pipeline = MailchimpPipeline::from_settings(
        &args.credentials(),
        settings,
        args.options(settings),
        storage,
        Arc::new(TokioPacer),
        &context,
    )?;

    EtlEngine::new(pipeline, context).run().await
}

async fn run_analytics(args: &AnalyticsArgs, settings: &Settings) -> Result<Artifact, EtlError> {
    let context = RunContext::new("analytics");
    let storage = LocalStorage::new(settings.output.directory.clone());
    let pipeline = AnalyticsPipeline::from_settings(
        args.credentials()?,
        settings,
        args.options(settings),
        storage,
        Arc::new(TokioPacer),
        &context,
    )?;

    EtlEngine::new(pipeline, context).run().await
}

fn exit_with(e: &EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
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
        ErrorSeverity::Low => 1,
        ErrorSeverity::Medium => 2, // 可重試
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting campaign-etl CLI");

    // 驗證配置
    let settings = match config.settings().and_then(|s| s.validate().map(|_| s)) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            exit_with(&e);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        exit_with(&e);
    }
    if config.verbose {
        tracing::debug!("Settings: {:?}", settings);
    }

    let result = match &config.command {
        Command::Mailchimp(args) => run_mailchimp(args, &settings).await,
        Command::Analytics(args) => run_analytics(args, &settings).await,
    };

    match result {
        Ok(artifact) if artifact.is_empty() => {
            println!("⚠️ No data extracted, nothing was written");
        }
        Ok(artifact) => {
            println!("✅ ETL process completed successfully!");
            for path in &artifact.paths {
                println!("📁 Output saved to: {}", path.display());
            }
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}
