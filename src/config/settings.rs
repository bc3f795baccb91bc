use crate::adapters::http::RetryPolicy;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 可選的 TOML 調校設定；每個欄位都有預設值
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output: OutputSettings,
    pub http: HttpSettings,
    pub mailchimp: MailchimpSettings,
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: "output".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub page_delay_ms: u64,
    pub rate_limit_cooldown_secs: u64,
    pub max_rate_limit_retries: u32,
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            page_delay_ms: 100,
            rate_limit_cooldown_secs: 60,
            max_rate_limit_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl HttpSettings {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(concat!("campaign-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_rate_limit_retries,
            cooldown: Duration::from_secs(self.rate_limit_cooldown_secs),
        }
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailchimpSettings {
    /// 覆寫 API 位址（測試或代理用）；未設定時由 server prefix 組出
    pub base_url: Option<String>,
    pub page_size: usize,
    pub base_name: String,
    pub member_status: String,
    pub member_list_limit: usize,
}

impl Default for MailchimpSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            page_size: 1000,
            base_name: "mailchimp_data".to_string(),
            member_status: "subscribed".to_string(),
            member_list_limit: 3,
        }
    }
}

impl MailchimpSettings {
    pub fn base_url_for(&self, server_prefix: &str) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.api.mailchimp.com/3.0", server_prefix),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsSettings {
    pub base_url: String,
    pub page_size: usize,
    pub base_name: String,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            base_url: "https://analyticsdata.googleapis.com/v1beta".to_string(),
            page_size: 100_000,
            base_name: "ga_data".to_string(),
            dimensions: crate::app::analytics::extract::DEFAULT_DIMENSIONS
                .iter()
                .map(|d| d.to_string())
                .collect(),
            metrics: crate::app::analytics::extract::DEFAULT_METRICS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

impl Settings {
    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        let settings = toml::from_str(&processed)?;
        Ok(settings)
    }

    /// 替換環境變數 (例如 ${MAILCHIMP_BASE_URL})；未設定的保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });
        Ok(result.into_owned())
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_path("output.directory", &self.output.directory)?;
        validate_range("http.timeout_secs", self.http.timeout_secs, 1, 600)?;
        validate_range("http.max_rate_limit_retries", self.http.max_rate_limit_retries, 0, 10)?;

        if let Some(url) = &self.mailchimp.base_url {
            validate_url("mailchimp.base_url", url)?;
        }
        validate_range("mailchimp.page_size", self.mailchimp.page_size, 1, 1000)?;
        validate_non_empty_string("mailchimp.base_name", &self.mailchimp.base_name)?;
        validate_non_empty_string("mailchimp.member_status", &self.mailchimp.member_status)?;

        validate_url("analytics.base_url", &self.analytics.base_url)?;
        validate_range("analytics.page_size", self.analytics.page_size, 1, 250_000)?;
        validate_non_empty_string("analytics.base_name", &self.analytics.base_name)?;
        if self.analytics.metrics.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "analytics.metrics".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::from_toml_str("").unwrap();

        assert_eq!(settings.output.directory, "output");
        assert_eq!(settings.mailchimp.page_size, 1000);
        assert_eq!(settings.http.retry_policy().max_retries, 3);
        assert_eq!(settings.http.retry_policy().cooldown, Duration::from_secs(60));
        assert_eq!(settings.http.page_delay(), Duration::from_millis(100));
        assert_eq!(settings.analytics.dimensions[0], "country");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::from_toml_str(
            r#"
            [http]
            max_rate_limit_retries = 5

            [mailchimp]
            page_size = 500
            "#,
        )
        .unwrap();

        assert_eq!(settings.http.max_rate_limit_retries, 5);
        assert_eq!(settings.http.timeout_secs, 30);
        assert_eq!(settings.mailchimp.page_size, 500);
        assert_eq!(settings.mailchimp.base_name, "mailchimp_data");
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CAMPAIGN_ETL_TEST_OUTPUT", "/tmp/etl-out");
        let settings = Settings::from_toml_str(
            r#"
            [output]
            directory = "${CAMPAIGN_ETL_TEST_OUTPUT}"
            "#,
        )
        .unwrap();

        assert_eq!(settings.output.directory, "/tmp/etl-out");
    }

    #[test]
    fn test_mailchimp_base_url() {
        let mut mailchimp = MailchimpSettings::default();
        assert_eq!(mailchimp.base_url_for("us21"), "https://us21.api.mailchimp.com/3.0");

        mailchimp.base_url = Some("http://127.0.0.1:8080/".to_string());
        assert_eq!(mailchimp.base_url_for("us21"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_page_size_rejected() {
        let mut settings = Settings::default();
        settings.mailchimp.page_size = 0;
        assert!(matches!(
            settings.validate(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = Settings::from_toml_str("[http\npage_delay_ms = ").unwrap_err();
        assert!(matches!(err, EtlError::TomlError(_)));
    }
}
