use crate::adapters::google_auth::Credentials;
use crate::adapters::http::ApiClient;
use crate::core::context::RunContext;
use crate::core::paginate::{Page, PageSource, Paginator};
use crate::domain::model::{Table, Value};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::Span;

pub const REPORT_TABLE: &str = "ga_data";

pub const DEFAULT_DIMENSIONS: &[&str] = &["country", "city", "date", "pagePath", "deviceCategory"];
pub const DEFAULT_METRICS: &[&str] = &["sessions", "totalUsers", "screenPageViews", "userEngagementDuration"];

/// 一次報表查詢的條件
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunReportRequest<'a> {
    dimensions: Vec<NameRef<'a>>,
    metrics: Vec<NameRef<'a>>,
    date_ranges: [DateRange; 1],
    limit: usize,
    offset: usize,
}

#[derive(Debug, Serialize)]
struct NameRef<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DateRange {
    start_date: String,
    end_date: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RunReportResponse {
    dimension_headers: Vec<Header>,
    metric_headers: Vec<Header>,
    rows: Vec<ApiRow>,
    row_count: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct Header {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ApiRow {
    dimension_values: Vec<CellValue>,
    metric_values: Vec<CellValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CellValue {
    value: String,
}

/// 報表的欄位標頭
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportHeaders {
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
}

/// 維度值與指標值都保持 API 給的字串
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub dimension_values: Vec<String>,
    pub metric_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportExtract {
    pub headers: ReportHeaders,
    pub rows: Vec<ReportRow>,
}

impl ReportExtract {
    /// 欄位依回應標頭宣告；缺值以 Null 補齊
    pub fn into_table(self) -> Result<Table> {
        let columns: Vec<String> = self
            .headers
            .dimensions
            .iter()
            .chain(&self.headers.metrics)
            .cloned()
            .collect();
        let dimension_count = self.headers.dimensions.len();
        let metric_count = self.headers.metrics.len();

        let mut table = Table::new(REPORT_TABLE, columns).with_title("GA_Data");
        for row in self.rows {
            let mut values: Vec<Value> = Vec::with_capacity(dimension_count + metric_count);
            let mut dims = row.dimension_values.into_iter();
            let mut mets = row.metric_values.into_iter();
            values.extend((0..dimension_count).map(|_| Value::from(dims.next())));
            values.extend((0..metric_count).map(|_| Value::from(mets.next())));
            table.push_row(values)?;
        }
        Ok(table)
    }
}

/// 把 properties/123 或 123 統一成 API 路徑用的 `properties/123`
pub fn property_path(property_id: &str) -> String {
    let id = property_id.trim().trim_start_matches("properties/");
    format!("properties/{}", id)
}

struct ReportSource<'a> {
    client: &'a ApiClient,
    path: String,
    query: &'a ReportQuery,
    headers: Mutex<Option<ReportHeaders>>,
}

#[async_trait]
impl PageSource for ReportSource<'_> {
    type Item = ReportRow;

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Page<ReportRow>> {
        let request = RunReportRequest {
            dimensions: self.query.dimensions.iter().map(|d| NameRef { name: d }).collect(),
            metrics: self.query.metrics.iter().map(|m| NameRef { name: m }).collect(),
            date_ranges: [DateRange {
                start_date: self.query.start_date.format("%Y-%m-%d").to_string(),
                end_date: self.query.end_date.format("%Y-%m-%d").to_string(),
            }],
            limit,
            offset,
        };

        let response: RunReportResponse = self.client.post_json(&self.path, &request).await?;

        if !response.dimension_headers.is_empty() || !response.metric_headers.is_empty() {
            if let Ok(mut headers) = self.headers.lock() {
                headers.get_or_insert_with(|| ReportHeaders {
                    dimensions: response.dimension_headers.iter().map(|h| h.name.clone()).collect(),
                    metrics: response.metric_headers.iter().map(|h| h.name.clone()).collect(),
                });
            }
        }

        let rows = response
            .rows
            .into_iter()
            .map(|row| ReportRow {
                dimension_values: row.dimension_values.into_iter().map(|c| c.value).collect(),
                metric_values: row.metric_values.into_iter().map(|c| c.value).collect(),
            })
            .collect();

        Ok(Page::new(rows).with_total(response.row_count))
    }
}

pub struct AnalyticsExtractor {
    client: ApiClient,
    credentials: Credentials,
    paginator: Paginator,
    property: String,
    span: Span,
}

impl AnalyticsExtractor {
    pub fn new(
        client: ApiClient,
        credentials: Credentials,
        paginator: Paginator,
        property_id: &str,
        context: &RunContext,
    ) -> Self {
        Self {
            client,
            credentials,
            paginator,
            property: property_path(property_id),
            span: context.component("analytics_extractor"),
        }
    }

    pub async fn extract(&self, query: &ReportQuery) -> Result<ReportExtract> {
        let token = self
            .credentials
            .access_token(self.client.http())
            .await
            .inspect_err(|e| tracing::error!(parent: &self.span, "Authentication failed: {}", e))?;
        let client = self.client.clone().with_authorization(format!("Bearer {}", token));

        tracing::info!(
            parent: &self.span,
            "📊 Running report for {} from {} to {}",
            self.property,
            query.start_date,
            query.end_date
        );

        let source = ReportSource {
            client: &client,
            path: format!("{}:runReport", self.property),
            query,
            headers: Mutex::new(None),
        };
        let paged = self
            .paginator
            .collect(&source)
            .await
            .inspect_err(|e| tracing::error!(parent: &self.span, "Data extraction failed: {}", e))?;

        // 沒有任何資料列時 API 可能不回標頭，退回請求的欄位
        let headers = source
            .headers
            .into_inner()
            .ok()
            .flatten()
            .unwrap_or_else(|| ReportHeaders {
                dimensions: query.dimensions.clone(),
                metrics: query.metrics.clone(),
            });

        tracing::info!(
            parent: &self.span,
            "Successfully extracted {} rows from GA in {} requests",
            paged.items.len(),
            paged.requests
        );
        Ok(ReportExtract {
            headers,
            rows: paged.items,
        })
    }
}
