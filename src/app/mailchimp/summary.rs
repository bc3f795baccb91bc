use crate::app::mailchimp::model::{CAMPAIGNS_TABLE, LISTS_TABLE, MEMBERS_TABLE};
use crate::domain::model::{Dataset, Table, Value};
use crate::utils::error::Result;
use std::collections::HashMap;

pub const DASHBOARD_TABLE: &str = "dashboard";
const TOP_COUNTRIES: usize = 5;

fn mean(values: &[Value]) -> Option<f64> {
    let numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        None
    } else {
        Some(numbers.iter().sum::<f64>() / numbers.len() as f64)
    }
}

fn sum_int(values: &[Value]) -> i64 {
    values.iter().filter_map(Value::as_i64).sum()
}

fn format_percent(rate: Option<f64>) -> Value {
    match rate {
        Some(r) => Value::Text(format!("{:.2}", r * 100.0)),
        None => Value::Null,
    }
}

/// 依出現次數由多到少，同數時依名稱排序
pub fn top_counts(values: &[Value], limit: usize) -> Vec<(String, i64)> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for value in values {
        if let Some(name) = value.as_str() {
            *counts.entry(name).or_default() += 1;
        }
    }
    let mut ranked: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(name, count)| (name.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Dashboard 工作表：Metric / Value 兩欄
pub fn dashboard(dataset: &Dataset) -> Result<Table> {
    let mut summary = Table::new(DASHBOARD_TABLE, ["Metric", "Value"]).with_title("Dashboard");

    if let Some(campaigns) = dataset.get(CAMPAIGNS_TABLE).filter(|t| !t.is_empty()) {
        summary.push_row(vec!["Total Campaigns".into(), Value::Int(campaigns.len() as i64)])?;
        summary.push_row(vec![
            "Avg Open Rate (%)".into(),
            format_percent(mean(&campaigns.column_or_null("open_rate"))),
        ])?;
        summary.push_row(vec![
            "Avg Click Rate (%)".into(),
            format_percent(mean(&campaigns.column_or_null("click_rate"))),
        ])?;
        summary.push_row(vec![
            "Total Emails Sent".into(),
            Value::Int(sum_int(&campaigns.column_or_null("emails_sent"))),
        ])?;
    }

    if let Some(lists) = dataset.get(LISTS_TABLE).filter(|t| !t.is_empty()) {
        summary.push_row(vec!["Total Lists".into(), Value::Int(lists.len() as i64)])?;
        summary.push_row(vec![
            "Total Subscribers".into(),
            Value::Int(sum_int(&lists.column_or_null("member_count"))),
        ])?;
        summary.push_row(vec![
            "Total Unsubscribes".into(),
            Value::Int(sum_int(&lists.column_or_null("unsubscribe_count"))),
        ])?;
    }

    if let Some(members) = dataset.get(MEMBERS_TABLE).filter(|t| t.has_column("country_name")) {
        for (country, count) in top_counts(&members.column_or_null("country_name"), TOP_COUNTRIES) {
            summary.push_row(vec![format!("Subscribers in {}", country).into(), Value::Int(count)])?;
        }
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dashboard_campaigns_and_lists() {
        let mut campaigns = Table::new(CAMPAIGNS_TABLE, ["open_rate", "click_rate", "emails_sent"]);
        campaigns
            .push_row(vec![Value::Float(0.2), Value::Float(0.01), Value::Int(100)])
            .unwrap();
        campaigns
            .push_row(vec![Value::Float(0.3), Value::Float(0.03), Value::Int(50)])
            .unwrap();
        let mut lists = Table::new(LISTS_TABLE, ["member_count", "unsubscribe_count"]);
        lists.push_row(vec![Value::Int(500), Value::Int(12)]).unwrap();

        let summary = dashboard(&Dataset::from_iter([lists, campaigns])).unwrap();

        assert_eq!(summary.title(), "Dashboard");
        let metrics = summary.column_or_null("Metric");
        let values = summary.column_or_null("Value");
        assert_eq!(metrics[0], Value::from("Total Campaigns"));
        assert_eq!(values[0], Value::Int(2));
        assert_eq!(values[1], Value::from("25.00"));
        assert_eq!(values[2], Value::from("2.00"));
        assert_eq!(values[3], Value::Int(150));
        assert_eq!(metrics[5], Value::from("Total Subscribers"));
        assert_eq!(values[5], Value::Int(500));
    }

    #[test]
    fn test_top_countries() {
        let mut members = Table::new(MEMBERS_TABLE, ["country_name"]);
        for name in ["Ukraine", "France", "Ukraine", "Germany", "France", "Ukraine"] {
            members.push_row(vec![name.into()]).unwrap();
        }
        members.push_row(vec![Value::Null]).unwrap();

        let summary = dashboard(&Dataset::from_iter([members])).unwrap();

        assert_eq!(summary.len(), 3);
        assert_eq!(summary.value(0, "Metric"), Some(&Value::from("Subscribers in Ukraine")));
        assert_eq!(summary.value(0, "Value"), Some(&Value::Int(3)));
        assert_eq!(summary.value(1, "Metric"), Some(&Value::from("Subscribers in France")));
    }

    #[test]
    fn test_empty_dataset_gives_empty_dashboard() {
        let summary = dashboard(&Dataset::new()).unwrap();
        assert!(summary.is_empty());
    }
}
