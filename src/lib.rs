pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod load;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{google_auth::Credentials, storage::LocalStorage};
pub use app::analytics::{AnalyticsOptions, AnalyticsPipeline};
pub use app::mailchimp::{MailchimpCredentials, MailchimpOptions, MailchimpPipeline};
pub use config::Settings;
pub use core::{context::RunContext, etl::EtlEngine, pacing::TokioPacer};
pub use domain::model::{Artifact, Dataset, OutputFormat, Table, Value};
pub use utils::error::{EtlError, Result};
