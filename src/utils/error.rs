use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("HTTP {status} returned by {url}: {body}")]
    HttpStatusError {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Rate limit still exceeded for {url} after {attempts} attempts")]
    RateLimitExceeded { url: String, attempts: u32 },

    #[error("Authentication failed: {message}")]
    AuthError { message: String },

    #[error("JWT signing failed: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Transform of {entity} failed: {message}")]
    TransformError { entity: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    RateLimit,
    Authentication,
    Configuration,
    Transform,
    Load,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn transform(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransformError {
            entity: entity.into(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ApiError(_) | Self::HttpStatusError { .. } => ErrorCategory::Network,
            Self::RateLimitExceeded { .. } => ErrorCategory::RateLimit,
            Self::AuthError { .. } | Self::JwtError(_) => ErrorCategory::Authentication,
            Self::TomlError(_)
            | Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            Self::TransformError { .. } | Self::ProcessingError { .. } => ErrorCategory::Transform,
            Self::ZipError(_) | Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => {
                ErrorCategory::Load
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::RateLimit => ErrorSeverity::Medium,
            ErrorCategory::Network | ErrorCategory::Transform => ErrorSeverity::High,
            ErrorCategory::Authentication | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Load => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => "Check network connectivity and the API base URL, then retry",
            ErrorCategory::RateLimit => "Wait a few minutes before running again or lower the request volume",
            ErrorCategory::Authentication => "Verify the API key or service account credentials",
            ErrorCategory::Configuration => "Review the command line flags, environment variables and settings file",
            ErrorCategory::Transform => "Inspect the source data for unexpected or malformed fields",
            ErrorCategory::Load => "Make sure the output directory is writable and has free space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RateLimitExceeded { attempts, .. } => {
                format!("The API kept rejecting requests (rate limited {} times)", attempts)
            }
            Self::HttpStatusError { status, url, .. } => {
                format!("The API at {} answered with HTTP {}", url, status)
            }
            Self::MissingConfigError { field } => format!("Missing required setting: {}", field),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_its_own_category() {
        let err = EtlError::RateLimitExceeded {
            url: "https://us1.api.mailchimp.com/3.0/lists".to_string(),
            attempts: 4,
        };
        assert_eq!(err.category(), ErrorCategory::RateLimit);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.user_friendly_message().contains("4 times"));
    }

    #[test]
    fn test_transform_helper() {
        let err = EtlError::transform("campaigns", "bad value");
        assert_eq!(err.category(), ErrorCategory::Transform);
        assert_eq!(err.to_string(), "Transform of campaigns failed: bad value");
    }
}
