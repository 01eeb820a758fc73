//! URL shortener adapter (Bitly v4).
//!
//! Failures are returned as `ShortenError`; the send pipeline treats them as non-fatal and
//! keeps the original link.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

const SHORTEN_TIMEOUT: Duration = Duration::from_secs(10);
const EXPAND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ShortenError {
    #[error("Bitly access token not configured")]
    NotConfigured,

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// A short link and the long URL it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortLink {
    pub short_url: String,
    pub long_url: String,
    pub id: Option<String>,
}

#[async_trait]
pub trait UrlShortener: Send + Sync {
    async fn shorten(&self, long_url: &str) -> Result<ShortLink, ShortenError>;

    async fn expand(&self, short_url: &str) -> Result<ShortLink, ShortenError>;
}

#[derive(Debug, Serialize)]
struct ShortenPayload<'a> {
    long_url: &'a str,
    domain: &'a str,
}

#[derive(Debug, Deserialize)]
struct BitlinkBody {
    link: String,
    long_url: String,
    id: Option<String>,
}

impl From<BitlinkBody> for ShortLink {
    fn from(body: BitlinkBody) -> Self {
        ShortLink {
            short_url: body.link,
            long_url: body.long_url,
            id: body.id,
        }
    }
}

#[derive(Clone)]
pub struct BitlyShortener {
    client: Client,
    access_token: Option<String>,
    base_url: String,
}

impl BitlyShortener {
    pub fn new(access_token: Option<String>, base_url: String) -> Self {
        if access_token.is_none() {
            warn!("Bitly access token not configured; links will be sent unshortened");
        }
        Self {
            client: Client::new(),
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn token(&self) -> Result<&str, ShortenError> {
        self.access_token.as_deref().ok_or(ShortenError::NotConfigured)
    }
}

#[async_trait]
impl UrlShortener for BitlyShortener {
    async fn shorten(&self, long_url: &str) -> Result<ShortLink, ShortenError> {
        let token = self.token()?;
        if !is_valid_url(long_url) {
            return Err(ShortenError::InvalidUrl);
        }

        debug!("Bitly: shortening {long_url}");

        let response = self
            .client
            .post(format!("{}/shorten", self.base_url))
            .bearer_auth(token)
            .timeout(SHORTEN_TIMEOUT)
            .json(&ShortenPayload {
                long_url,
                domain: "bit.ly",
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, "Failed to shorten URL"),
            });
        }

        let link: BitlinkBody = response.json().await?;
        Ok(link.into())
    }

    async fn expand(&self, short_url: &str) -> Result<ShortLink, ShortenError> {
        let token = self.token()?;
        let bitlink_id = extract_bitlink_id(short_url);

        let response = self
            .client
            .get(format!("{}/bitlinks/{}", self.base_url, bitlink_id))
            .bearer_auth(token)
            .timeout(EXPAND_TIMEOUT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ShortenError::Api {
                status: status.as_u16(),
                message: api_error_message(&body, "Failed to expand URL"),
            });
        }

        let link: BitlinkBody = response.json().await?;
        Ok(link.into())
    }
}

pub fn is_valid_url(candidate: &str) -> bool {
    Url::parse(candidate).is_ok()
}

/// `https://bit.ly/abc123` → `bit.ly/abc123`. Anything else is passed through.
pub fn extract_bitlink_id(short_url: &str) -> String {
    match short_url.find("bit.ly/") {
        Some(idx) if idx + "bit.ly/".len() < short_url.len() => short_url[idx..].to_string(),
        _ => short_url.to_string(),
    }
}

/// Bitly error bodies carry `message` and sometimes `description`.
fn api_error_message(body: &str, fallback: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("description"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback.to_string())
}
