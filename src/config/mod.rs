#[cfg(feature = "cli")]
pub mod cli;
pub mod settings;

#[cfg(feature = "cli")]
pub use cli::{AnalyticsArgs, CliConfig, Command, MailchimpArgs};
pub use settings::Settings;
