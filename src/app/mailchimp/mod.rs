pub mod extract;
pub mod model;
pub mod summary;
pub mod transform;

use crate::adapters::http::ApiClient;
use crate::config::settings::Settings;
use crate::core::context::RunContext;
use crate::core::paginate::Paginator;
use crate::domain::model::{Artifact, Dataset, OutputFormat, Table};
use crate::domain::ports::{Pacer, Pipeline, Storage};
use crate::load::Loader;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;

pub use extract::MailchimpExtractor;
pub use model::{
    CampaignRecord, ListRecord, MailchimpExtract, MemberRecord, CAMPAIGNS_TABLE, LISTS_TABLE,
    MEMBERS_TABLE,
};
pub use transform::MailchimpTransformer;

#[derive(Debug, Clone)]
pub struct MailchimpCredentials {
    pub api_key: String,
    pub server_prefix: String,
}

/// 單次執行的選項
#[derive(Debug, Clone)]
pub struct MailchimpOptions {
    pub include_members: bool,
    pub list_ids: Vec<String>,
    pub since: Option<NaiveDate>,
    pub member_status: String,
    pub member_list_limit: usize,
    pub format: OutputFormat,
}

impl Default for MailchimpOptions {
    fn default() -> Self {
        Self {
            include_members: false,
            list_ids: Vec::new(),
            since: None,
            member_status: "subscribed".to_string(),
            member_list_limit: 3,
            format: OutputFormat::Csv,
        }
    }
}

pub struct MailchimpPipeline<S: Storage> {
    extractor: MailchimpExtractor,
    transformer: MailchimpTransformer,
    loader: Loader<S>,
    options: MailchimpOptions,
}

impl<S: Storage> MailchimpPipeline<S> {
    pub fn new(
        extractor: MailchimpExtractor,
        transformer: MailchimpTransformer,
        loader: Loader<S>,
        options: MailchimpOptions,
    ) -> Self {
        Self {
            extractor,
            transformer,
            loader,
            options,
        }
    }

    /// 由設定組出完整的 pipeline
    pub fn from_settings(
        credentials: &MailchimpCredentials,
        settings: &Settings,
        options: MailchimpOptions,
        storage: S,
        pacer: Arc<dyn Pacer>,
        context: &RunContext,
    ) -> Result<Self> {
        let client = ApiClient::new(
            settings.http.build_client()?,
            settings.mailchimp.base_url_for(&credentials.server_prefix),
            pacer.clone(),
        )
        .with_authorization(format!("apikey {}", credentials.api_key))
        .with_retry_policy(settings.http.retry_policy());

        let paginator = Paginator::new(
            settings.mailchimp.page_size,
            settings.http.page_delay(),
            pacer,
        );

        Ok(Self::new(
            MailchimpExtractor::new(client, paginator, context),
            MailchimpTransformer::new(context),
            Loader::new(storage, settings.mailchimp.base_name.clone(), context),
            options,
        ))
    }

    /// 沒指定 list id 時，取前幾個 list
    fn member_list_ids(&self, lists: &[ListRecord]) -> Vec<String> {
        if !self.options.list_ids.is_empty() {
            return self.options.list_ids.clone();
        }
        lists
            .iter()
            .take(self.options.member_list_limit)
            .map(|l| l.list_id.clone())
            .collect()
    }
}

#[async_trait]
impl<S: Storage> Pipeline for MailchimpPipeline<S> {
    type Extracted = MailchimpExtract;

    fn name(&self) -> &'static str {
        "mailchimp"
    }

    async fn extract(&self) -> Result<MailchimpExtract> {
        let lists = self.extractor.extract_lists().await?;
        let campaigns = self.extractor.extract_campaigns(self.options.since).await?;

        let members = if self.options.include_members {
            let mut all_members = Vec::new();
            for list_id in self.member_list_ids(&lists) {
                let members = self
                    .extractor
                    .extract_members(&list_id, &self.options.member_status)
                    .await?;
                all_members.extend(members);
            }
            Some(all_members)
        } else {
            None
        };

        Ok(MailchimpExtract {
            lists,
            campaigns,
            members,
        })
    }

    async fn transform(&self, extracted: MailchimpExtract) -> Result<Dataset> {
        let mut dataset = Dataset::new();

        let lists = Table::from_records(LISTS_TABLE, extracted.lists);
        dataset.push(self.transformer.transform(&lists)?);

        let campaigns = Table::from_records(CAMPAIGNS_TABLE, extracted.campaigns);
        dataset.push(self.transformer.transform(&campaigns)?);

        if let Some(members) = extracted.members.filter(|m| !m.is_empty()) {
            let members = Table::from_records(MEMBERS_TABLE, members);
            dataset.push(self.transformer.transform(&members)?);
        }

        Ok(dataset)
    }

    async fn load(&self, dataset: Dataset) -> Result<Artifact> {
        let dashboard = summary::dashboard(&dataset)?;
        self.loader
            .load(&dataset, Some(&dashboard), self.options.format)
            .await
    }
}
