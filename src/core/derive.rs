use crate::core::timestamp::normalize_timestamp;
use crate::domain::model::{Table, Value};
use crate::utils::error::Result;
use chrono::NaiveDateTime;

pub const EXTRACTED_AT: &str = "extracted_at";
pub const DATA_SOURCE: &str = "data_source";

/// numerator / denominator × 100；分母不是正數或任一值缺失時為 0
pub fn percentage(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d > 0.0 => n / d * 100.0,
        _ => 0.0,
    }
}

/// numerator / denominator；分母為 0 或缺失時為 0
pub fn ratio(numerator: Option<f64>, denominator: Option<f64>) -> f64 {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 => n / d,
        _ => 0.0,
    }
}

pub fn normalize_timestamp_columns(table: &mut Table, entity: &str, columns: &[&str]) -> Result<()> {
    for column in columns {
        table.map_column(column, |v| normalize_timestamp(entity, column, v))?;
    }
    Ok(())
}

/// 加上 `extracted_at` 與（選擇性的）`data_source`
pub fn annotate_provenance(table: &mut Table, now: NaiveDateTime, source: Option<&str>) -> Result<()> {
    let rows = table.len();
    table.set_column(EXTRACTED_AT, vec![Value::Timestamp(now); rows])?;
    if let Some(source) = source {
        table.set_column(DATA_SOURCE, vec![Value::from(source); rows])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage_guards_zero_and_missing() {
        assert_eq!(percentage(Some(5.0), Some(200.0)), 2.5);
        assert_eq!(percentage(Some(5.0), Some(0.0)), 0.0);
        assert_eq!(percentage(None, Some(10.0)), 0.0);
        assert_eq!(percentage(Some(1.0), None), 0.0);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(Some(90.0), Some(3.0)), 30.0);
        assert_eq!(ratio(Some(90.0), Some(0.0)), 0.0);
        assert_eq!(ratio(Some(90.0), None), 0.0);
    }
}
