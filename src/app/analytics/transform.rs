use crate::core::context::RunContext;
use crate::core::derive::{annotate_provenance, ratio};
use crate::core::timestamp::parse_date;
use crate::domain::model::{Table, Value};
use crate::utils::error::{EtlError, Result};
use chrono::{Local, NaiveDateTime};
use tracing::Span;

pub const DATA_SOURCE_TAG: &str = "google_analytics";
pub const AVG_ENGAGEMENT_DURATION: &str = "avg_engagement_duration";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Integer,
    Float,
}

const METRIC_TYPES: &[(&str, MetricKind)] = &[
    ("sessions", MetricKind::Integer),
    ("totalUsers", MetricKind::Integer),
    ("screenPageViews", MetricKind::Integer),
    ("userEngagementDuration", MetricKind::Float),
];

const COUNTRY_ALIASES: &[(&str, &str)] = &[("Russian Federation", "Russia"), ("United States", "USA")];

pub fn metric_kind(name: &str) -> Option<MetricKind> {
    METRIC_TYPES
        .iter()
        .find(|(metric, _)| *metric == name)
        .map(|(_, kind)| *kind)
}

/// 每個字母片段首字大寫、其餘小寫
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_word = false;
    for c in raw.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// 已是正規名稱（如 `USA`）的值原樣保留
pub fn clean_country(raw: &str) -> String {
    let raw = raw.trim();
    if COUNTRY_ALIASES.iter().any(|(_, canonical)| *canonical == raw) {
        return raw.to_string();
    }
    let name = title_case(raw);
    COUNTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(name)
}

fn coerce_metric(column: &str, kind: MetricKind, value: &Value) -> Result<Value> {
    let failed = |raw: &str| {
        EtlError::transform(
            "analytics",
            format!("cannot coerce '{}' in metric '{}' to {:?}", raw, column, kind),
        )
    };

    match (kind, value) {
        (_, Value::Null) => Ok(Value::Null),
        (MetricKind::Integer, Value::Int(_)) | (MetricKind::Float, Value::Float(_)) => Ok(value.clone()),
        (MetricKind::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (_, Value::Text(s)) if s.trim().is_empty() => Ok(Value::Null),
        (MetricKind::Integer, Value::Text(s)) => {
            let s = s.trim();
            // API 偶爾回傳 "12.0" 這類整數值
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Value::Int)
                .ok_or_else(|| failed(s))
        }
        (MetricKind::Float, Value::Text(s)) => s.trim().parse::<f64>().map(Value::Float).map_err(|_| failed(s.trim())),
        (_, other) => Err(failed(other.to_string().as_str())),
    }
}

fn coerce_date(value: &Value) -> Result<Value> {
    match value {
        Value::Null | Value::Date(_) => Ok(value.clone()),
        Value::Timestamp(ts) => Ok(Value::Date(ts.date())),
        Value::Text(s) if s.trim().is_empty() => Ok(Value::Null),
        Value::Text(s) => parse_date(s)
            .map(Value::Date)
            .ok_or_else(|| EtlError::transform("analytics", format!("cannot parse '{}' in column 'date' as a date", s))),
        other => Err(EtlError::transform(
            "analytics",
            format!("unexpected value {:?} in column 'date'", other),
        )),
    }
}

pub struct AnalyticsTransformer {
    now: Option<NaiveDateTime>,
    span: Span,
}

impl AnalyticsTransformer {
    pub fn new(context: &RunContext) -> Self {
        Self {
            now: None,
            span: context.component("analytics_transformer"),
        }
    }

    pub fn at(context: &RunContext, now: NaiveDateTime) -> Self {
        Self {
            now: Some(now),
            span: context.component("analytics_transformer"),
        }
    }

    pub fn transform(&self, input: &Table) -> Result<Table> {
        let mut table = input.clone();
        if table.is_empty() {
            tracing::warn!(parent: &self.span, "⚠️ No data to transform for {}", input.name());
            return Ok(table);
        }

        let metric_columns: Vec<(String, MetricKind)> = table
            .columns()
            .iter()
            .filter_map(|c| metric_kind(c).map(|kind| (c.clone(), kind)))
            .collect();
        for (column, kind) in &metric_columns {
            table
                .map_column(column, |v| coerce_metric(column, *kind, v))
                .inspect_err(|e| tracing::error!(parent: &self.span, "Data transformation failed: {}", e))?;
        }

        table.map_column("date", coerce_date)?;

        table.map_column("country", |v| {
            Ok(match v.as_str() {
                Some(name) => Value::Text(clean_country(name)),
                None => v.clone(),
            })
        })?;

        if table.has_column("userEngagementDuration") {
            let durations = table.column_or_null("userEngagementDuration");
            let sessions = table.column_or_null("sessions");
            let averages = durations
                .iter()
                .zip(&sessions)
                .map(|(d, s)| Value::Float(ratio(d.as_f64(), s.as_f64())))
                .collect();
            table.set_column(AVG_ENGAGEMENT_DURATION, averages)?;
        }

        let now = self.now.unwrap_or_else(|| Local::now().naive_local());
        annotate_provenance(&mut table, now, Some(DATA_SOURCE_TAG))?;
        tracing::info!(
            parent: &self.span,
            "Successfully transformed {} rows",
            table.len()
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn transformer() -> AnalyticsTransformer {
        let now = NaiveDate::from_ymd_opt(2024, 2, 1)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        AnalyticsTransformer::at(&RunContext::new("analytics"), now)
    }

    fn report(rows: Vec<[&str; 4]>) -> Table {
        let mut table = Table::new(
            "ga_data",
            ["country", "date", "sessions", "userEngagementDuration"],
        );
        for row in rows {
            table.push_row(row.iter().map(|v| Value::from(*v)).collect()).unwrap();
        }
        table
    }

    #[test]
    fn test_title_case_and_aliases() {
        assert_eq!(title_case("new zealand"), "New Zealand");
        assert_eq!(title_case("GUINEA-BISSAU"), "Guinea-Bissau");
        assert_eq!(clean_country("  russian federation "), "Russia");
        assert_eq!(clean_country("united states"), "USA");
        assert_eq!(clean_country("Ukraine"), "Ukraine");
        assert_eq!(clean_country(&clean_country("united states")), "USA");
        assert_eq!(clean_country(&clean_country("Russian Federation")), "Russia");
    }

    #[test]
    fn test_metrics_are_coerced() {
        let table = transformer()
            .transform(&report(vec![["ukraine", "20240115", "4", "90.5"]]))
            .unwrap();

        assert_eq!(table.value(0, "sessions"), Some(&Value::Int(4)));
        assert_eq!(table.value(0, "userEngagementDuration"), Some(&Value::Float(90.5)));
        assert_eq!(
            table.value(0, "date"),
            Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()))
        );
        assert_eq!(table.value(0, "country"), Some(&Value::from("Ukraine")));
        assert_eq!(table.value(0, "data_source"), Some(&Value::from(DATA_SOURCE_TAG)));
    }

    #[test]
    fn test_avg_engagement_duration_guards_zero_sessions() {
        let table = transformer()
            .transform(&report(vec![
                ["France", "20240101", "3", "90"],
                ["France", "20240102", "0", "15"],
            ]))
            .unwrap();

        assert_eq!(table.value(0, AVG_ENGAGEMENT_DURATION), Some(&Value::Float(30.0)));
        assert_eq!(table.value(1, AVG_ENGAGEMENT_DURATION), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_uncoercible_metric_fails() {
        let err = transformer()
            .transform(&report(vec![["France", "20240101", "lots", "1"]]))
            .unwrap_err();
        assert!(matches!(err, EtlError::TransformError { .. }));
    }

    #[test]
    fn test_transform_is_idempotent() {
        let t = transformer();
        let once = t
            .transform(&report(vec![
                ["germany", "20240110", "8", "40"],
                ["united states", "20240111", "2", "10"],
                ["russian federation", "20240112", "0", "0"],
            ]))
            .unwrap();
        let twice = t.transform(&once).unwrap();

        assert_eq!(once.columns(), twice.columns());
        assert_eq!(once.rows(), twice.rows());
    }

    #[test]
    fn test_clock_is_read_when_transforming() {
        let t = AnalyticsTransformer::new(&RunContext::new("analytics"));
        std::thread::sleep(std::time::Duration::from_millis(50));
        let before = Local::now().naive_local();

        let table = t.transform(&report(vec![["France", "20240101", "1", "1"]])).unwrap();

        let extracted_at = table.value(0, "extracted_at").and_then(Value::as_timestamp).unwrap();
        assert!(extracted_at >= before);
    }

    #[test]
    fn test_empty_table_passes_through() {
        let table = transformer().transform(&report(vec![])).unwrap();
        assert!(table.is_empty());
        assert!(!table.has_column(AVG_ENGAGEMENT_DURATION));
    }
}
