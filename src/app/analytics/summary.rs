use crate::domain::model::{Table, Value};
use crate::utils::error::Result;
use std::collections::HashMap;

pub const SUMMARY_TABLE: &str = "summary";
const TOP_COUNTRIES: usize = 10;
const TOTALLED_METRICS: [&str; 3] = ["sessions", "totalUsers", "screenPageViews"];

/// 依 sessions 加總排前十的國家
pub fn summary(report: &Table) -> Result<Table> {
    let mut columns = vec!["metric"];
    columns.extend(TOTALLED_METRICS);
    let mut summary = Table::new(SUMMARY_TABLE, columns).with_title("Summary");

    if !report.has_column("country") {
        return Ok(summary);
    }

    let countries = report.column_or_null("country");
    let metrics: Vec<Vec<Value>> = TOTALLED_METRICS
        .iter()
        .map(|m| report.column_or_null(m))
        .collect();

    let mut totals: HashMap<&str, [i64; 3]> = HashMap::new();
    for (row, country) in countries.iter().enumerate() {
        let Some(country) = country.as_str() else {
            continue;
        };
        let entry = totals.entry(country).or_default();
        for (i, column) in metrics.iter().enumerate() {
            entry[i] += column[row].as_i64().unwrap_or_default();
        }
    }

    let mut ranked: Vec<(&str, [i64; 3])> = totals.into_iter().collect();
    ranked.sort_by(|a, b| b.1[0].cmp(&a.1[0]).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_COUNTRIES);

    for (country, [sessions, users, views]) in ranked {
        summary.push_row(vec![
            format!("Top Country: {}", country).into(),
            Value::Int(sessions),
            Value::Int(users),
            Value::Int(views),
        ])?;
    }
    Ok(summary)
}
