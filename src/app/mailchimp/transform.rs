use crate::app::mailchimp::model::{CAMPAIGNS_TABLE, LISTS_TABLE, MEMBERS_TABLE};
use crate::core::context::RunContext;
use crate::core::derive::{annotate_provenance, normalize_timestamp_columns, percentage};
use crate::domain::model::{Table, Value};
use crate::utils::error::Result;
use chrono::{Local, NaiveDateTime, Timelike};
use tracing::Span;

pub const DATA_SOURCE_TAG: &str = "mailchimp";

const COUNTRY_NAMES: &[(&str, &str)] = &[
    ("UA", "Ukraine"),
    ("RU", "Russia"),
    ("US", "United States"),
    ("GB", "United Kingdom"),
    ("DE", "Germany"),
    ("FR", "France"),
];

/// 查表得到國名，查不到就沿用原始代碼
pub fn country_name(code: &str) -> String {
    COUNTRY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// open_rate × 100 的區間分級
pub fn performance_category(open_rate_percent: f64) -> Option<&'static str> {
    match open_rate_percent {
        p if (0.0..15.0).contains(&p) => Some("Low"),
        p if (15.0..25.0).contains(&p) => Some("Medium"),
        p if (25.0..35.0).contains(&p) => Some("High"),
        p if (35.0..=100.0).contains(&p) => Some("Excellent"),
        _ => None,
    }
}

pub struct MailchimpTransformer {
    now: Option<NaiveDateTime>,
    span: Span,
}

impl MailchimpTransformer {
    /// 每次 transform 時才讀取時鐘
    pub fn new(context: &RunContext) -> Self {
        Self {
            now: None,
            span: context.component("mailchimp_transformer"),
        }
    }

    /// 以固定的「現在」建立，方便重現
    pub fn at(context: &RunContext, now: NaiveDateTime) -> Self {
        Self {
            now: Some(now),
            span: context.component("mailchimp_transformer"),
        }
    }

    fn now(&self) -> NaiveDateTime {
        self.now.unwrap_or_else(|| Local::now().naive_local())
    }

    pub fn transform(&self, input: &Table) -> Result<Table> {
        let mut table = input.clone();
        if table.is_empty() {
            tracing::warn!(parent: &self.span, "⚠️ No data to transform for {}", input.name());
            return Ok(table);
        }

        let now = self.now();
        match input.name() {
            LISTS_TABLE => self.derive_list_columns(&mut table)?,
            CAMPAIGNS_TABLE => self.derive_campaign_columns(&mut table)?,
            MEMBERS_TABLE => self.derive_member_columns(&mut table, now)?,
            other => {
                tracing::debug!(parent: &self.span, "No derived columns for table '{}'", other);
            }
        }

        annotate_provenance(&mut table, now, Some(DATA_SOURCE_TAG))?;
        tracing::info!(
            parent: &self.span,
            "Successfully transformed {} data: {} rows",
            input.name(),
            table.len()
        );
        Ok(table)
    }

    fn derive_list_columns(&self, table: &mut Table) -> Result<()> {
        normalize_timestamp_columns(table, LISTS_TABLE, &["date_created"])?;

        let unsubscribes = table.column_or_null("unsubscribe_count");
        let members = table.column_or_null("member_count");
        let rates = unsubscribes
            .iter()
            .zip(&members)
            .map(|(u, m)| Value::Float(percentage(u.as_f64(), m.as_f64())))
            .collect();
        table.set_column("unsubscribe_rate", rates)
    }

    fn derive_campaign_columns(&self, table: &mut Table) -> Result<()> {
        if table.has_column("send_time") {
            normalize_timestamp_columns(table, CAMPAIGNS_TABLE, &["send_time"])?;
            let send_times = table.column_or_null("send_time");
            let dates = send_times
                .iter()
                .map(|v| v.as_timestamp().map(|ts| Value::Date(ts.date())).unwrap_or_default())
                .collect();
            let hours = send_times
                .iter()
                .map(|v| v.as_timestamp().map(|ts| Value::Int(i64::from(ts.hour()))).unwrap_or_default())
                .collect();
            table.set_column("send_date", dates)?;
            table.set_column("send_hour", hours)?;
        }

        let opens = table.column_or_null("unique_opens");
        let clicks = table.column_or_null("unique_clicks");
        let sent = table.column_or_null("emails_sent");
        let engagement = opens
            .iter()
            .zip(&clicks)
            .zip(&sent)
            .map(|((o, c), s)| {
                let engaged = match (o.as_f64(), c.as_f64()) {
                    (Some(o), Some(c)) => Some(o + c),
                    _ => None,
                };
                Value::Float(percentage(engaged, s.as_f64()))
            })
            .collect();
        table.set_column("engagement_rate", engagement)?;

        let categories = table
            .column_or_null("open_rate")
            .iter()
            .map(|rate| {
                rate.as_f64()
                    .and_then(|r| performance_category(r * 100.0))
                    .map(Value::from)
                    .unwrap_or_default()
            })
            .collect();
        table.set_column("performance_category", categories)
    }

    fn derive_member_columns(&self, table: &mut Table, now: NaiveDateTime) -> Result<()> {
        normalize_timestamp_columns(table, MEMBERS_TABLE, &["timestamp_signup", "timestamp_opt"])?;

        if table.has_column("country_code") {
            let names = table
                .column_or_null("country_code")
                .iter()
                .map(|code| match code {
                    Value::Text(code) => Value::Text(country_name(code)),
                    other => other.clone(),
                })
                .collect();
            table.set_column("country_name", names)?;
        }

        if table.has_column("timestamp_signup") {
            let tenure = table
                .column_or_null("timestamp_signup")
                .iter()
                .map(|v| {
                    v.as_timestamp()
                        .map(|signup| Value::Int((now - signup).num_days()))
                        .unwrap_or_default()
                })
                .collect();
            table.set_column("days_since_signup", tenure)?;
        }
        Ok(())
    }
}
