mod common;

use campaign_etl::core::pacing::RecordingPacer;
use campaign_etl::{
    AnalyticsOptions, AnalyticsPipeline, Credentials, EtlEngine, EtlError, LocalStorage,
    OutputFormat, RunContext, Settings,
};
use chrono::NaiveDate;
use common::analytics_settings;
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::io::Read;
use std::sync::Arc;
use tempfile::TempDir;

const REPORT_PATH: &str = "/properties/123456:runReport";

fn report_response(rows: &[(&str, &str, &str, &str)], row_count: usize) -> Value {
    let rows: Vec<Value> = rows
        .iter()
        .map(|(country, date, sessions, duration)| {
            json!({
                "dimensionValues": [{"value": country}, {"value": date}],
                "metricValues": [{"value": sessions}, {"value": "2"}, {"value": "5"}, {"value": duration}]
            })
        })
        .collect();
    json!({
        "dimensionHeaders": [{"name": "country"}, {"name": "date"}],
        "metricHeaders": [
            {"name": "sessions", "type": "TYPE_INTEGER"},
            {"name": "totalUsers", "type": "TYPE_INTEGER"},
            {"name": "screenPageViews", "type": "TYPE_INTEGER"},
            {"name": "userEngagementDuration", "type": "TYPE_SECONDS"}
        ],
        "rows": rows,
        "rowCount": row_count
    })
}

fn options(format: OutputFormat) -> AnalyticsOptions {
    let mut options = AnalyticsOptions::new("123456").with_dates(
        NaiveDate::from_ymd_opt(2024, 1, 1),
        NaiveDate::from_ymd_opt(2024, 1, 31),
    );
    options.dimensions = vec!["country".to_string(), "date".to_string()];
    options.format = format;
    options
}

fn engine(
    settings: &Settings,
    output_dir: &TempDir,
    format: OutputFormat,
) -> EtlEngine<AnalyticsPipeline<LocalStorage>> {
    let context = RunContext::new("analytics");
    let pipeline = AnalyticsPipeline::from_settings(
        Credentials::AccessToken("test-token".to_string()),
        settings,
        options(format),
        LocalStorage::new(output_dir.path()),
        Arc::new(RecordingPacer::new()),
        &context,
    )
    .unwrap();
    EtlEngine::new(pipeline, context)
}

#[tokio::test]
async fn test_report_to_excel_with_summary() {
    let server = MockServer::start();
    let report_mock = server.mock(|when, then| {
        when.method(POST)
            .path(REPORT_PATH)
            .header("Authorization", "Bearer test-token")
            .json_body_partial(
                r#"{
                    "dimensions": [{"name": "country"}, {"name": "date"}],
                    "dateRanges": [{"startDate": "2024-01-01", "endDate": "2024-01-31"}],
                    "offset": 0
                }"#,
            );
        then.status(200).json_body(report_response(
            &[
                ("russian federation", "20240102", "12", "240"),
                ("Ukraine", "20240103", "30", "600"),
                ("Ukraine", "20240104", "0", "0"),
            ],
            3,
        ));
    });

    let temp_dir = TempDir::new().unwrap();
    let settings = analytics_settings(server.base_url(), temp_dir.path().to_str().unwrap());
    let artifact = engine(&settings, &temp_dir, OutputFormat::Excel)
        .run()
        .await
        .unwrap();

    // rowCount 已經到齊，不再請求下一頁
    report_mock.assert_hits(1);

    assert_eq!(artifact.paths.len(), 1);
    let file_name = artifact.paths[0].file_name().unwrap().to_str().unwrap();
    assert!(file_name.starts_with("ga_data_"));
    assert!(file_name.ends_with(".xlsx"));

    let file = std::fs::File::open(&artifact.paths[0]).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook)
        .unwrap();
    assert!(workbook.contains(r#"name="GA_Data""#));
    assert!(workbook.contains(r#"name="Summary""#));

    let mut summary_sheet = String::new();
    archive
        .by_name("xl/worksheets/sheet2.xml")
        .unwrap()
        .read_to_string(&mut summary_sheet)
        .unwrap();
    let ukraine = summary_sheet.find("Top Country: Ukraine").unwrap();
    let russia = summary_sheet.find("Top Country: Russia").unwrap();
    assert!(ukraine < russia);
}

#[tokio::test]
async fn test_report_pages_until_row_count() {
    let server = MockServer::start();
    let first_page = server.mock(|when, then| {
        when.method(POST)
            .path(REPORT_PATH)
            .json_body_partial(r#"{"limit": 2, "offset": 0}"#);
        then.status(200).json_body(report_response(
            &[
                ("France", "20240105", "3", "90"),
                ("united states", "20240105", "4", "20"),
            ],
            3,
        ));
    });
    let second_page = server.mock(|when, then| {
        when.method(POST)
            .path(REPORT_PATH)
            .json_body_partial(r#"{"limit": 2, "offset": 2}"#);
        then.status(200)
            .json_body(report_response(&[("France", "20240106", "1", "10")], 3));
    });

    let temp_dir = TempDir::new().unwrap();
    let mut settings = analytics_settings(server.base_url(), temp_dir.path().to_str().unwrap());
    settings.analytics.page_size = 2;

    let artifact = engine(&settings, &temp_dir, OutputFormat::Json)
        .run()
        .await
        .unwrap();

    first_page.assert();
    second_page.assert();

    let content = std::fs::read_to_string(&artifact.paths[0]).unwrap();
    let output: Value = serde_json::from_str(&content).unwrap();
    let rows = output["ga_data"].as_array().unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["country"], "France");
    assert_eq!(rows[0]["date"], "2024-01-05");
    assert_eq!(rows[0]["sessions"], 3);
    assert_eq!(rows[0]["avg_engagement_duration"], 30.0);
    assert_eq!(rows[1]["country"], "USA");
    assert_eq!(rows[2]["data_source"], "google_analytics");
}

#[tokio::test]
async fn test_uncoercible_metric_aborts_before_load() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(REPORT_PATH);
        then.status(200)
            .json_body(report_response(&[("France", "20240105", "n/a", "90")], 1));
    });

    let temp_dir = TempDir::new().unwrap();
    let settings = analytics_settings(server.base_url(), temp_dir.path().to_str().unwrap());

    let err = engine(&settings, &temp_dir, OutputFormat::Csv)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, EtlError::TransformError { .. }));
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unauthorized_response_is_reported() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path(REPORT_PATH);
        then.status(403)
            .json_body(json!({"error": {"code": 403, "status": "PERMISSION_DENIED"}}));
    });

    let temp_dir = TempDir::new().unwrap();
    let settings = analytics_settings(server.base_url(), temp_dir.path().to_str().unwrap());

    let err = engine(&settings, &temp_dir, OutputFormat::Csv)
        .run()
        .await
        .unwrap_err();

    match err {
        EtlError::HttpStatusError { status, body, .. } => {
            assert_eq!(status, 403);
            assert!(body.contains("PERMISSION_DENIED"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
