use crate::domain::model::{Tabular, Value};

pub const LISTS_TABLE: &str = "lists";
pub const CAMPAIGNS_TABLE: &str = "campaigns";
pub const MEMBERS_TABLE: &str = "members";

#[derive(Debug, Clone, PartialEq)]
pub struct ListRecord {
    pub list_id: String,
    pub list_name: String,
    pub member_count: i64,
    pub unsubscribe_count: i64,
    pub open_rate: f64,
    pub click_rate: f64,
    pub date_created: Option<String>,
    pub visibility: String,
}

impl Tabular for ListRecord {
    const COLUMNS: &'static [&'static str] = &[
        "list_id",
        "list_name",
        "member_count",
        "unsubscribe_count",
        "open_rate",
        "click_rate",
        "date_created",
        "visibility",
    ];

    fn into_row(self) -> Vec<Value> {
        vec![
            self.list_id.into(),
            self.list_name.into(),
            self.member_count.into(),
            self.unsubscribe_count.into(),
            self.open_rate.into(),
            self.click_rate.into(),
            self.date_created.into(),
            self.visibility.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CampaignRecord {
    pub campaign_id: String,
    pub campaign_name: String,
    pub list_id: Option<String>,
    pub send_time: Option<String>,
    pub emails_sent: i64,
    pub opens: i64,
    pub unique_opens: i64,
    pub open_rate: f64,
    pub clicks: i64,
    pub unique_clicks: i64,
    pub click_rate: f64,
    pub unsubscribes: i64,
    pub bounces: i64,
    pub campaign_type: String,
    pub status: Option<String>,
}

impl Tabular for CampaignRecord {
    const COLUMNS: &'static [&'static str] = &[
        "campaign_id",
        "campaign_name",
        "list_id",
        "send_time",
        "emails_sent",
        "opens",
        "unique_opens",
        "open_rate",
        "clicks",
        "unique_clicks",
        "click_rate",
        "unsubscribes",
        "bounces",
        "campaign_type",
        "status",
    ];

    fn into_row(self) -> Vec<Value> {
        vec![
            self.campaign_id.into(),
            self.campaign_name.into(),
            self.list_id.into(),
            self.send_time.into(),
            self.emails_sent.into(),
            self.opens.into(),
            self.unique_opens.into(),
            self.open_rate.into(),
            self.clicks.into(),
            self.unique_clicks.into(),
            self.click_rate.into(),
            self.unsubscribes.into(),
            self.bounces.into(),
            self.campaign_type.into(),
            self.status.into(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MemberRecord {
    pub member_id: String,
    pub email: String,
    pub status: String,
    pub list_id: String,
    pub timestamp_signup: Option<String>,
    pub timestamp_opt: Option<String>,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub ip_signup: Option<String>,
    pub ip_opt: Option<String>,
    pub language: Option<String>,
    pub member_rating: i64,
    pub email_client: Option<String>,
    pub tags_count: i64,
}

impl Tabular for MemberRecord {
    const COLUMNS: &'static [&'static str] = &[
        "member_id",
        "email",
        "status",
        "list_id",
        "timestamp_signup",
        "timestamp_opt",
        "country_code",
        "timezone",
        "latitude",
        "longitude",
        "ip_signup",
        "ip_opt",
        "language",
        "member_rating",
        "email_client",
        "tags_count",
    ];

    fn into_row(self) -> Vec<Value> {
        vec![
            self.member_id.into(),
            self.email.into(),
            self.status.into(),
            self.list_id.into(),
            self.timestamp_signup.into(),
            self.timestamp_opt.into(),
            self.country_code.into(),
            self.timezone.into(),
            self.latitude.into(),
            self.longitude.into(),
            self.ip_signup.into(),
            self.ip_opt.into(),
            self.language.into(),
            self.member_rating.into(),
            self.email_client.into(),
            self.tags_count.into(),
        ]
    }
}

/// 一次 Mailchimp 抽取的原始結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailchimpExtract {
    pub lists: Vec<ListRecord>,
    pub campaigns: Vec<CampaignRecord>,
    pub members: Option<Vec<MemberRecord>>,
}
