pub mod analytics;
pub mod mailchimp;
