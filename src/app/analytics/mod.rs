pub mod extract;
pub mod summary;
pub mod transform;

use crate::adapters::google_auth::Credentials;
use crate::adapters::http::ApiClient;
use crate::config::settings::Settings;
use crate::core::context::RunContext;
use crate::core::paginate::Paginator;
use crate::domain::model::{Artifact, Dataset, OutputFormat};
use crate::domain::ports::{Pacer, Pipeline, Storage};
use crate::load::Loader;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::{Duration, Local, NaiveDate};
use std::sync::Arc;

pub use extract::{AnalyticsExtractor, ReportExtract, ReportQuery, REPORT_TABLE};
pub use transform::AnalyticsTransformer;

#[derive(Debug, Clone)]
pub struct AnalyticsOptions {
    pub property_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dimensions: Vec<String>,
    pub metrics: Vec<String>,
    pub format: OutputFormat,
}

impl AnalyticsOptions {
    /// 預設區間：30 天前到昨天
    pub fn new(property_id: impl Into<String>) -> Self {
        let today = Local::now().date_naive();
        Self {
            property_id: property_id.into(),
            start_date: today - Duration::days(30),
            end_date: today - Duration::days(1),
            dimensions: extract::DEFAULT_DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            metrics: extract::DEFAULT_METRICS.iter().map(|m| m.to_string()).collect(),
            format: OutputFormat::Csv,
        }
    }

    pub fn with_dates(mut self, start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        if let Some(start) = start_date {
            self.start_date = start;
        }
        if let Some(end) = end_date {
            self.end_date = end;
        }
        self
    }

    pub fn query(&self) -> ReportQuery {
        ReportQuery {
            start_date: self.start_date,
            end_date: self.end_date,
            dimensions: self.dimensions.clone(),
            metrics: self.metrics.clone(),
        }
    }
}

pub struct AnalyticsPipeline<S: Storage> {
    extractor: AnalyticsExtractor,
    transformer: AnalyticsTransformer,
    loader: Loader<S>,
    options: AnalyticsOptions,
}

impl<S: Storage> AnalyticsPipeline<S> {
    pub fn new(
        extractor: AnalyticsExtractor,
        transformer: AnalyticsTransformer,
        loader: Loader<S>,
        options: AnalyticsOptions,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            options,
        }
    }

    pub fn from_settings(
        credentials: Credentials,
        settings: &Settings,
        options: AnalyticsOptions,
        storage: S,
        pacer: Arc<dyn Pacer>,
        context: &RunContext,
    ) -> Result<Self> {
        let client = ApiClient::new(
            settings.http.build_client()?,
            settings.analytics.base_url.clone(),
            pacer.clone(),
        )
        .with_retry_policy(settings.http.retry_policy());

        let paginator = Paginator::new(
            settings.analytics.page_size,
            settings.http.page_delay(),
            pacer,
        );

        Ok(Self::new(
            AnalyticsExtractor::new(client, credentials, paginator, &options.property_id, context),
            AnalyticsTransformer::new(context),
            Loader::new(storage, settings.analytics.base_name.clone(), context),
            options,
        ))
    }
}

#[async_trait]
impl<S: Storage> Pipeline for AnalyticsPipeline<S> {
    type Extracted = ReportExtract;

    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn extract(&self) -> Result<ReportExtract> {
        self.extractor.extract(&self.options.query()).await
    }

    async fn transform(&self, extracted: ReportExtract) -> Result<Dataset> {
        let table = self.transformer.transform(&extracted.into_table()?)?;
        Ok(Dataset::from_iter([table]))
    }

    async fn load(&self, dataset: Dataset) -> Result<Artifact> {
        let summary = match dataset.get(REPORT_TABLE) {
            Some(report) => Some(summary::summary(report)?),
            None => None,
        };
        self.loader
            .load(&dataset, summary.as_ref(), self.options.format)
            .await
    }
}
