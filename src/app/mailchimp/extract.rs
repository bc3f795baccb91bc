use crate::adapters::http::ApiClient;
use crate::app::mailchimp::model::{CampaignRecord, ListRecord, MemberRecord};
use crate::core::context::RunContext;
use crate::core::paginate::{Page, PageSource, Paginator};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use tracing::Span;

#[derive(Debug, Deserialize)]
struct ApiList {
    id: String,
    name: String,
    #[serde(default)]
    stats: ApiListStats,
    date_created: Option<String>,
    visibility: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiListStats {
    member_count: i64,
    unsubscribe_count: i64,
    open_rate: f64,
    click_rate: f64,
}

#[derive(Debug, Deserialize)]
struct ApiCampaign {
    id: String,
    #[serde(default)]
    settings: ApiCampaignSettings,
    #[serde(default)]
    recipients: ApiRecipients,
    send_time: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiCampaignSettings {
    subject_line: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiRecipients {
    list_id: Option<String>,
}

/// `reports/{campaign_id}` 回應中需要的統計
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiCampaignReport {
    emails_sent: i64,
    opens: ApiOpens,
    clicks: ApiClicks,
    unsubscribed: i64,
    bounces: ApiBounces,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiOpens {
    opens_total: i64,
    unique_opens: i64,
    open_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiClicks {
    clicks_total: i64,
    unique_clicks: i64,
    click_rate: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiBounces {
    hard_bounces: i64,
    soft_bounces: i64,
}

#[derive(Debug, Deserialize)]
struct ApiMember {
    id: String,
    email_address: String,
    status: String,
    timestamp_signup: Option<String>,
    timestamp_opt: Option<String>,
    #[serde(default)]
    location: ApiLocation,
    ip_signup: Option<String>,
    ip_opt: Option<String>,
    language: Option<String>,
    #[serde(default)]
    member_rating: i64,
    email_client: Option<String>,
    #[serde(default)]
    tags_count: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ApiLocation {
    country_code: Option<String>,
    timezone: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// Mailchimp 對缺值常給空字串，統一視為 null
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

fn flatten_list(list: ApiList) -> ListRecord {
    ListRecord {
        list_id: list.id,
        list_name: list.name,
        member_count: list.stats.member_count,
        unsubscribe_count: list.stats.unsubscribe_count,
        open_rate: list.stats.open_rate,
        click_rate: list.stats.click_rate,
        date_created: non_empty(list.date_created),
        visibility: non_empty(list.visibility).unwrap_or_else(|| "private".to_string()),
    }
}

fn flatten_campaign(campaign: ApiCampaign, report: ApiCampaignReport) -> CampaignRecord {
    CampaignRecord {
        campaign_id: campaign.id,
        campaign_name: non_empty(campaign.settings.subject_line)
            .unwrap_or_else(|| "Unknown".to_string()),
        list_id: non_empty(campaign.recipients.list_id),
        send_time: non_empty(campaign.send_time),
        emails_sent: report.emails_sent,
        opens: report.opens.opens_total,
        unique_opens: report.opens.unique_opens,
        open_rate: report.opens.open_rate,
        clicks: report.clicks.clicks_total,
        unique_clicks: report.clicks.unique_clicks,
        click_rate: report.clicks.click_rate,
        unsubscribes: report.unsubscribed,
        bounces: report.bounces.hard_bounces + report.bounces.soft_bounces,
        campaign_type: non_empty(campaign.kind).unwrap_or_else(|| "regular".to_string()),
        status: non_empty(campaign.status),
    }
}

fn flatten_member(member: ApiMember, list_id: &str) -> MemberRecord {
    MemberRecord {
        member_id: member.id,
        email: member.email_address,
        status: member.status,
        list_id: list_id.to_string(),
        timestamp_signup: non_empty(member.timestamp_signup),
        timestamp_opt: non_empty(member.timestamp_opt),
        country_code: non_empty(member.location.country_code),
        timezone: non_empty(member.location.timezone),
        latitude: member.location.latitude,
        longitude: member.location.longitude,
        ip_signup: non_empty(member.ip_signup),
        ip_opt: non_empty(member.ip_opt),
        language: non_empty(member.language),
        member_rating: member.member_rating,
        email_client: non_empty(member.email_client),
        tags_count: member.tags_count,
    }
}

/// Mailchimp 集合端點（`lists`、`campaigns`、`lists/{id}/members`）的 count/offset 分頁
struct CollectionSource<'a, T> {
    client: &'a ApiClient,
    path: String,
    key: &'static str,
    params: Vec<(&'static str, String)>,
    _item: PhantomData<fn() -> T>,
}

impl<'a, T> CollectionSource<'a, T> {
    fn new(
        client: &'a ApiClient,
        path: impl Into<String>,
        key: &'static str,
        params: Vec<(&'static str, String)>,
    ) -> Self {
        Self {
            client,
            path: path.into(),
            key,
            params,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> PageSource for CollectionSource<'_, T> {
    type Item = T;

    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Page<T>> {
        let mut query: Vec<(&str, String)> =
            vec![("count", limit.to_string()), ("offset", offset.to_string())];
        query.extend(self.params.iter().cloned());

        let mut body: serde_json::Value = self.client.get_json(&self.path, &query).await?;
        let items = match body.get_mut(self.key).map(serde_json::Value::take) {
            Some(array @ serde_json::Value::Array(_)) => serde_json::from_value(array)?,
            _ => Vec::new(),
        };
        Ok(Page::new(items))
    }
}

pub struct MailchimpExtractor {
    client: ApiClient,
    paginator: Paginator,
    span: Span,
}

impl MailchimpExtractor {
    pub fn new(client: ApiClient, paginator: Paginator, context: &RunContext) -> Self {
        Self {
            client,
            paginator,
            span: context.component("mailchimp_extractor"),
        }
    }

    pub async fn extract_lists(&self) -> Result<Vec<ListRecord>> {
        tracing::info!(parent: &self.span, "📋 Extracting mailing lists...");

        let source = CollectionSource::<ApiList>::new(&self.client, "lists", "lists", Vec::new());
        let paged = self.paginator.collect(&source).await.inspect_err(|e| {
            tracing::error!(parent: &self.span, "Failed to extract lists: {}", e);
        })?;

        let lists: Vec<ListRecord> = paged.items.into_iter().map(flatten_list).collect();
        tracing::info!(parent: &self.span, "Extracted {} mailing lists", lists.len());
        Ok(lists)
    }

    /// 每個 campaign 另外呼叫一次 `reports/{id}` 取統計
    pub async fn extract_campaigns(&self, since: Option<NaiveDate>) -> Result<Vec<CampaignRecord>> {
        tracing::info!(parent: &self.span, "📨 Extracting campaigns...");

        let mut params = vec![("status", "sent".to_string())];
        if let Some(since) = since {
            params.push(("since_send_time", format!("{}T00:00:00+00:00", since.format("%Y-%m-%d"))));
        }

        let source = CollectionSource::<ApiCampaign>::new(&self.client, "campaigns", "campaigns", params);
        let paged = self.paginator.collect(&source).await.inspect_err(|e| {
            tracing::error!(parent: &self.span, "Failed to extract campaigns: {}", e);
        })?;

        let mut campaigns = Vec::with_capacity(paged.items.len());
        for campaign in paged.items {
            let path = format!("reports/{}", campaign.id);
            let report: ApiCampaignReport =
                self.client.get_json(&path, &[]).await.inspect_err(|e| {
                    tracing::error!(
                        parent: &self.span,
                        "Failed to fetch report for campaign {}: {}",
                        campaign.id,
                        e
                    );
                })?;
            campaigns.push(flatten_campaign(campaign, report));
            self.paginator.pace().await;
        }

        tracing::info!(parent: &self.span, "Extracted {} campaigns", campaigns.len());
        Ok(campaigns)
    }

    pub async fn extract_members(&self, list_id: &str, status: &str) -> Result<Vec<MemberRecord>> {
        tracing::info!(parent: &self.span, "👥 Extracting members for list {}...", list_id);

        let source = CollectionSource::<ApiMember>::new(
            &self.client,
            format!("lists/{}/members", list_id),
            "members",
            vec![("status", status.to_string())],
        );
        let paged = self.paginator.collect(&source).await.inspect_err(|e| {
            tracing::error!(parent: &self.span, "Failed to extract members of {}: {}", list_id, e);
        })?;

        let members: Vec<MemberRecord> = paged
            .items
            .into_iter()
            .map(|m| flatten_member(m, list_id))
            .collect();
        tracing::info!(
            parent: &self.span,
            "Extracted {} members for list {} in {} requests",
            members.len(),
            list_id,
            paged.requests
        );
        Ok(members)
    }
}
