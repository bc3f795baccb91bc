use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ANALYTICS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/analytics.readonly";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// service account JSON 金鑰中用得到的欄位
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl ServiceAccountKey {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| EtlError::AuthError {
            message: format!(
                "Cannot read credentials file {}: {}",
                path.as_ref().display(),
                e
            ),
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Analytics API 的認證來源
#[derive(Debug, Clone)]
pub enum Credentials {
    /// 已取得的 OAuth access token
    AccessToken(String),
    /// service account 金鑰檔路徑，執行時換成 access token
    ServiceAccount(PathBuf),
}

impl Credentials {
    pub async fn access_token(&self, client: &Client) -> Result<String> {
        match self {
            Credentials::AccessToken(token) => Ok(token.clone()),
            Credentials::ServiceAccount(path) => {
                let key = ServiceAccountKey::from_file(path)?;
                let token = exchange_for_token(client, &key, ANALYTICS_READONLY_SCOPE).await?;
                tracing::info!("🔑 Authenticated with Google Analytics as {}", key.client_email);
                Ok(token)
            }
        }
    }
}

pub fn sign_assertion(key: &ServiceAccountKey, scope: &str, issued_at: i64) -> Result<String> {
    let claims = Claims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat: issued_at,
        exp: issued_at + ASSERTION_LIFETIME_SECS,
    };
    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
    Ok(encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)?)
}

pub async fn exchange_for_token(
    client: &Client,
    key: &ServiceAccountKey,
    scope: &str,
) -> Result<String> {
    let assertion = sign_assertion(key, scope, Utc::now().timestamp())?;

    let response = client
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(EtlError::AuthError {
            message: format!("Token endpoint returned {}: {}", status, body),
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token.access_token)
}
