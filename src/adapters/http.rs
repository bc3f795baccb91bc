use crate::domain::ports::Pacer;
use crate::utils::error::{EtlError, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// 429 的處理方式：固定冷卻後重送同一個請求，次數有上限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub cooldown: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// 帶認證標頭、會處理 rate limit 的 JSON API 客戶端
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    authorization: Option<String>,
    retry: RetryPolicy,
    pacer: Arc<dyn Pacer>,
}

impl ApiClient {
    pub fn new(client: Client, base_url: impl Into<String>, pacer: Arc<dyn Pacer>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization: None,
            retry: RetryPolicy::default(),
            pacer,
        }
    }

    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(path);
        tracing::debug!("📡 GET {} {:?}", url, query);

        let response = self
            .send_with_retry(&url, || self.authorize(self.client.get(&url).query(query)))
            .await?;
        Ok(response.json().await?)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!("📡 POST {}", url);

        let response = self
            .send_with_retry(&url, || self.authorize(self.client.post(&url).json(body)))
            .await?;
        Ok(response.json().await?)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.authorization {
            Some(value) => request.header(reqwest::header::AUTHORIZATION, value),
            None => request,
        }
    }

    async fn send_with_retry<F>(&self, url: &str, build: F) -> Result<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;

        loop {
            let response = build().send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if retries >= self.retry.max_retries {
                    tracing::error!("🚫 Rate limit persisted for {} after {} attempts", url, retries + 1);
                    return Err(EtlError::RateLimitExceeded {
                        url: url.to_string(),
                        attempts: retries + 1,
                    });
                }
                retries += 1;
                tracing::warn!(
                    "⏳ Rate limit reached for {}, waiting {:?} before retry {}/{}",
                    url,
                    self.retry.cooldown,
                    retries,
                    self.retry.max_retries
                );
                self.pacer.pause(self.retry.cooldown).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                tracing::error!("❌ API request to {} failed with {}", url, status);
                return Err(EtlError::HttpStatusError {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body,
                });
            }

            return Ok(response);
        }
    }
}
