use crate::adapters::google_auth::Credentials;
use crate::app::analytics::AnalyticsOptions;
use crate::app::mailchimp::{MailchimpCredentials, MailchimpOptions};
use crate::config::settings::Settings;
use crate::domain::model::OutputFormat;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_date_range, validate_non_empty_string, validate_server_prefix, Validate,
};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "campaign-etl")]
#[command(about = "Extract Mailchimp and Google Analytics data into CSV, Excel or JSON files")]
#[command(version)]
pub struct CliConfig {
    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(long, global = true, help = "Optional TOML settings file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Override the output directory")]
    pub output_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Lists, sent campaigns and (optionally) members from Mailchimp
    Mailchimp(MailchimpArgs),
    /// A runReport query against a Google Analytics 4 property
    Analytics(AnalyticsArgs),
}

#[derive(Debug, Clone, Args)]
pub struct MailchimpArgs {
    #[arg(long, env = "MAILCHIMP_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "MAILCHIMP_SERVER_PREFIX", default_value = "us1")]
    pub server_prefix: String,

    #[arg(long, help = "Also extract list members")]
    pub include_members: bool,

    #[arg(long, value_delimiter = ',', help = "Lists to extract members from")]
    pub list_ids: Vec<String>,

    #[arg(long, help = "Only campaigns sent on or after this date (YYYY-MM-DD)")]
    pub since: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Args)]
pub struct AnalyticsArgs {
    #[arg(long, env = "GA_PROPERTY_ID")]
    pub property_id: String,

    #[arg(long, env = "GA_CREDENTIALS_PATH", help = "Service account key file")]
    pub credentials_path: Option<PathBuf>,

    #[arg(long, env = "GA_ACCESS_TOKEN", hide_env_values = true, help = "Pre-issued OAuth access token")]
    pub access_token: Option<String>,

    #[arg(long, help = "Defaults to 30 days ago")]
    pub start_date: Option<NaiveDate>,

    #[arg(long, help = "Defaults to yesterday")]
    pub end_date: Option<NaiveDate>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    pub format: OutputFormat,
}

impl CliConfig {
    /// 讀設定檔（若有），再套用命令列覆寫
    pub fn settings(&self) -> Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::from_file(path)?,
            None => Settings::default(),
        };
        if let Some(dir) = &self.output_dir {
            settings.output.directory = dir.clone();
        }
        Ok(settings)
    }
}

impl MailchimpArgs {
    pub fn credentials(&self) -> MailchimpCredentials {
        MailchimpCredentials {
            api_key: self.api_key.clone(),
            server_prefix: self.server_prefix.clone(),
        }
    }

    pub fn options(&self, settings: &Settings) -> MailchimpOptions {
        MailchimpOptions {
            include_members: self.include_members,
            list_ids: self.list_ids.clone(),
            since: self.since,
            member_status: settings.mailchimp.member_status.clone(),
            member_list_limit: settings.mailchimp.member_list_limit,
            format: self.format,
        }
    }
}

impl AnalyticsArgs {
    /// access token 優先，其次是 service account 金鑰檔
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.access_token, &self.credentials_path) {
            (Some(token), _) => Ok(Credentials::AccessToken(token.clone())),
            (None, Some(path)) => Ok(Credentials::ServiceAccount(path.clone())),
            (None, None) => Err(EtlError::MissingConfigError {
                field: "GA_CREDENTIALS_PATH".to_string(),
            }),
        }
    }

    pub fn options(&self, settings: &Settings) -> AnalyticsOptions {
        let mut options = AnalyticsOptions::new(self.property_id.clone())
            .with_dates(self.start_date, self.end_date);
        options.dimensions = settings.analytics.dimensions.clone();
        options.metrics = settings.analytics.metrics.clone();
        options.format = self.format;
        options
    }
}

impl Validate for MailchimpArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("MAILCHIMP_API_KEY", &self.api_key)?;
        validate_server_prefix("MAILCHIMP_SERVER_PREFIX", &self.server_prefix)?;
        for id in &self.list_ids {
            validate_non_empty_string("list_ids", id)?;
        }
        Ok(())
    }
}

impl Validate for AnalyticsArgs {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("GA_PROPERTY_ID", &self.property_id)?;
        self.credentials()?;
        // 只給一端時，另一端用預設區間補上後再比較
        let resolved = self.options(&Settings::default());
        validate_date_range("date_range", resolved.start_date, resolved.end_date)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Mailchimp(args) => args.validate(),
            Command::Analytics(args) => args.validate(),
        }
    }
}
