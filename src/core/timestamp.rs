use crate::domain::model::Value;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// 解析 ISO-8601 類的字串；帶時區的只保留當地時間（去掉 offset）
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.naive_local());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    parse_date(raw).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// `2024-01-31` 或 Analytics 的 `20240131`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

/// 把單一儲存格正規化為 naive timestamp；已是 timestamp 的原樣保留
pub fn normalize_timestamp(entity: &str, column: &str, value: &Value) -> Result<Value> {
    match value {
        Value::Null | Value::Timestamp(_) => Ok(value.clone()),
        Value::Date(d) => Ok(d.and_hms_opt(0, 0, 0).map(Value::Timestamp).unwrap_or(Value::Null)),
        Value::Text(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::Text(s) => parse_timestamp(s).map(Value::Timestamp).ok_or_else(|| {
            EtlError::transform(entity, format!("cannot parse '{}' in column '{}' as a timestamp", s, column))
        }),
        other => Err(EtlError::transform(
            entity,
            format!("unexpected value {:?} in timestamp column '{}'", other, column),
        )),
    }
}
