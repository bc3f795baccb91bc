use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EtlError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_date_range(field_name: &str, start: NaiveDate, end: NaiveDate) -> Result<()> {
    if start > end {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: format!("{}..{}", start, end),
            reason: "Start date must not be after end date".to_string(),
        });
    }
    Ok(())
}

/// Mailchimp 的 server prefix 形如 `us1`、`us21`
pub fn validate_server_prefix(field_name: &str, prefix: &str) -> Result<()> {
    let valid = !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(EtlError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: prefix.to_string(),
            reason: "Server prefix must be alphanumeric, e.g. 'us1'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("mailchimp.base_url", "https://us1.api.mailchimp.com/3.0").is_ok());
        assert!(validate_url("mailchimp.base_url", "http://localhost:8080").is_ok());
        assert!(validate_url("mailchimp.base_url", "").is_err());
        assert!(validate_url("mailchimp.base_url", "invalid-url").is_err());
        assert!(validate_url("mailchimp.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("mailchimp.page_size", 1000, 1, 1000).is_ok());
        assert!(validate_range("mailchimp.page_size", 0, 1, 1000).is_err());
        assert!(validate_range("mailchimp.page_size", 1001, 1, 1000).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert!(validate_date_range("analytics.dates", jan1, jan31).is_ok());
        assert!(validate_date_range("analytics.dates", jan31, jan1).is_err());
    }

    #[test]
    fn test_validate_server_prefix() {
        assert!(validate_server_prefix("server_prefix", "us21").is_ok());
        assert!(validate_server_prefix("server_prefix", "").is_err());
        assert!(validate_server_prefix("server_prefix", "us1.evil.com/").is_err());
    }
}
