//! SMS gateway adapters (SimpleTexting v2).
//!
//! `AppState` carries an `Arc<dyn SmsGateway>` built once by `build_sms_gateway`. Whether the
//! mock or the live adapter is used is decided by the `mock_mode` value handed to the factory;
//! nothing in here reads the environment.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::sms::validation::mask_phone;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);
const STATUS_TIMEOUT: Duration = Duration::from_secs(5);

/// Prefix on every id produced by the mock gateway.
pub const MOCK_ID_PREFIX: &str = "mock_";

#[derive(Debug, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub message: String,
    /// HTTP status returned by the gateway, if it answered at all.
    pub status_code: Option<u16>,
}

impl GatewayError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
        }
    }
}

/// What the gateway reported for an accepted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmsReceipt {
    pub external_message_id: String,
    pub status: String,
    pub is_mock_mode: bool,
}

#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// Sends one message. No retries.
    async fn send_sms(&self, phone: &str, body: &str) -> Result<SmsReceipt, GatewayError>;

    /// Current delivery status for a previously accepted message.
    async fn message_status(&self, external_message_id: &str) -> Result<String, GatewayError>;

    fn is_mock_mode(&self) -> bool;
}

/// Settings for `build_sms_gateway`, resolved from `Config` at startup.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub mock_mode: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    pub mock_delay: Duration,
}

pub fn build_sms_gateway(settings: GatewaySettings) -> Arc<dyn SmsGateway> {
    match (settings.mock_mode, settings.api_key) {
        (false, Some(api_key)) => {
            info!("SMS gateway: SimpleTexting live mode ({})", settings.base_url);
            Arc::new(SimpleTextingGateway::new(api_key, settings.base_url))
        }
        _ => {
            info!("SMS gateway: mock mode, no messages will leave this process");
            Arc::new(MockSmsGateway::new(settings.mock_delay))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Mock gateway
// ────────────────────────────────────────────────────────────────────────────

/// Simulated gateway: waits `delay`, then reports success. Never touches the network.
#[derive(Debug, Clone)]
pub struct MockSmsGateway {
    delay: Duration,
}

impl MockSmsGateway {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl SmsGateway for MockSmsGateway {
    async fn send_sms(&self, phone: &str, body: &str) -> Result<SmsReceipt, GatewayError> {
        tokio::time::sleep(self.delay).await;

        let external_message_id = format!("{MOCK_ID_PREFIX}{}", Uuid::new_v4().simple());
        info!(
            provider = "mock",
            phone = %mask_phone(phone),
            message_id = %external_message_id,
            message_length = body.chars().count(),
            "SMS sent (mock)"
        );

        Ok(SmsReceipt {
            external_message_id,
            status: "sent".to_string(),
            is_mock_mode: true,
        })
    }

    async fn message_status(&self, _external_message_id: &str) -> Result<String, GatewayError> {
        Ok("delivered".to_string())
    }

    fn is_mock_mode(&self) -> bool {
        true
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimpleTexting gateway
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendPayload<'a> {
    text: &'a str,
    contact_phone: &'a str,
}

#[derive(Clone)]
pub struct SimpleTextingGateway {
    client: Client,
    api_key: String,
    base_url: String,
}

impl SimpleTextingGateway {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl SmsGateway for SimpleTextingGateway {
    async fn send_sms(&self, phone: &str, body: &str) -> Result<SmsReceipt, GatewayError> {
        let contact_phone = normalize_phone(phone);
        let url = format!("{}/api/messages", self.base_url);

        info!(
            provider = "simpletexting",
            phone = %mask_phone(phone),
            message_length = body.chars().count(),
            "Sending SMS"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(SEND_TIMEOUT)
            .json(&SendPayload {
                text: body,
                contact_phone: &contact_phone,
            })
            .send()
            .await
            .map_err(|e| {
                warn!("SimpleTexting: request to {url} failed: {e}");
                GatewayError::new(e.to_string())
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let parsed: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            warn!("SimpleTexting: API returned {status}: {text}");
            return Err(GatewayError {
                message: parsed
                    .as_ref()
                    .and_then(error_text)
                    .unwrap_or_else(|| format!("SMS gateway returned status {}", status.as_u16())),
                status_code: Some(status.as_u16()),
            });
        }

        let data = parsed.unwrap_or(Value::Null);
        let external_message_id = string_field(&data, "id")
            .or_else(|| string_field(&data, "message_id"))
            .unwrap_or_else(|| format!("sms_{}", Utc::now().timestamp_millis()));
        let status = string_field(&data, "status").unwrap_or_else(|| "sent".to_string());

        info!("SimpleTexting: message accepted as {external_message_id}");

        Ok(SmsReceipt {
            external_message_id,
            status,
            is_mock_mode: false,
        })
    }

    async fn message_status(&self, external_message_id: &str) -> Result<String, GatewayError> {
        let response = self
            .client
            .get(format!("{}/api/messages/{}", self.base_url, external_message_id))
            .bearer_auth(&self.api_key)
            .timeout(STATUS_TIMEOUT)
            .send()
            .await
            .map_err(|e| GatewayError::new(e.to_string()))?;

        let status = response.status();
        let data: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::new(e.to_string()))?;

        if !status.is_success() {
            return Err(GatewayError {
                message: error_text(&data)
                    .unwrap_or_else(|| format!("SMS gateway returned status {}", status.as_u16())),
                status_code: Some(status.as_u16()),
            });
        }

        string_field(&data, "status")
            .ok_or_else(|| GatewayError::new("SMS gateway response had no status"))
    }

    fn is_mock_mode(&self) -> bool {
        false
    }
}

/// Digits only, with a leading country code `1` added when absent.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with('1') {
        digits
    } else {
        format!("1{digits}")
    }
}

/// Ids may come back as strings or numbers.
fn string_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn error_text(data: &Value) -> Option<String> {
    string_field(data, "message").or_else(|| string_field(data, "error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::{
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("404-555-1234"), "14045551234");
        assert_eq!(normalize_phone("1-404-555-1234"), "14045551234");
        assert_eq!(normalize_phone("(404) 555 1234"), "14045551234");
    }

    #[test]
    fn test_string_field_accepts_numbers() {
        let data = json!({ "id": 42, "status": "", "message_id": "m-1" });
        assert_eq!(string_field(&data, "id").as_deref(), Some("42"));
        assert_eq!(string_field(&data, "status"), None);
        assert_eq!(string_field(&data, "missing"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_send_waits_and_succeeds() {
        let gateway = MockSmsGateway::new(Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        let receipt = gateway.send_sms("404-555-1234", "hello").await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(1));
        assert!(receipt.is_mock_mode);
        assert!(receipt.external_message_id.starts_with(MOCK_ID_PREFIX));
        assert_eq!(receipt.status, "sent");
    }

    #[tokio::test]
    async fn test_mock_ids_are_unique() {
        let gateway = MockSmsGateway::new(Duration::ZERO);
        let a = gateway.send_sms("404-555-1234", "a").await.unwrap();
        let b = gateway.send_sms("404-555-1234", "b").await.unwrap();
        assert_ne!(a.external_message_id, b.external_message_id);
    }

    #[tokio::test]
    async fn test_mock_status_is_delivered() {
        let gateway = MockSmsGateway::new(Duration::ZERO);
        assert_eq!(gateway.message_status("mock_x").await.unwrap(), "delivered");
    }

    #[test]
    fn test_factory_prefers_mock_without_key() {
        let gateway = build_sms_gateway(GatewaySettings {
            mock_mode: false,
            api_key: None,
            base_url: "http://unused".to_string(),
            mock_delay: Duration::ZERO,
        });
        assert!(gateway.is_mock_mode());
    }

    #[test]
    fn test_factory_respects_injected_mock_flag() {
        let mock = build_sms_gateway(GatewaySettings {
            mock_mode: true,
            api_key: Some("key".into()),
            base_url: "http://unused".to_string(),
            mock_delay: Duration::ZERO,
        });
        assert!(mock.is_mock_mode());

        let live = build_sms_gateway(GatewaySettings {
            mock_mode: false,
            api_key: Some("key".into()),
            base_url: "http://unused".to_string(),
            mock_delay: Duration::ZERO,
        });
        assert!(!live.is_mock_mode());
    }

    #[tokio::test]
    async fn test_live_send_posts_normalized_phone() {
        let seen: Arc<Mutex<Option<(Value, String)>>> = Arc::new(Mutex::new(None));
        let captured = seen.clone();
        let app = Router::new().route(
            "/api/messages",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *captured.lock().unwrap() = Some((body, auth));
                    Json(json!({ "id": "st-123", "status": "queued" }))
                }
            }),
        );
        let base = spawn_server(app).await;

        let gateway = SimpleTextingGateway::new("secret".into(), base);
        let receipt = gateway.send_sms("404-555-1234", "Thanks John!").await.unwrap();

        assert_eq!(receipt.external_message_id, "st-123");
        assert_eq!(receipt.status, "queued");
        assert!(!receipt.is_mock_mode);

        let (body, auth) = seen.lock().unwrap().clone().unwrap();
        assert_eq!(body["contactPhone"], "14045551234");
        assert_eq!(body["text"], "Thanks John!");
        assert_eq!(auth, "Bearer secret");
    }

    #[tokio::test]
    async fn test_live_send_falls_back_to_generated_id() {
        let app = Router::new().route("/api/messages", post(|| async { Json(json!({})) }));
        let base = spawn_server(app).await;

        let gateway = SimpleTextingGateway::new("secret".into(), base);
        let receipt = gateway.send_sms("404-555-1234", "hi").await.unwrap();
        assert!(receipt.external_message_id.starts_with("sms_"));
        assert_eq!(receipt.status, "sent");
    }

    #[tokio::test]
    async fn test_live_send_surfaces_gateway_error() {
        let app = Router::new().route(
            "/api/messages",
            post(|| async {
                (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({ "message": "Contact phone is invalid" })),
                )
            }),
        );
        let base = spawn_server(app).await;

        let gateway = SimpleTextingGateway::new("secret".into(), base);
        let err = gateway.send_sms("404-555-1234", "hi").await.unwrap_err();
        assert_eq!(err.message, "Contact phone is invalid");
        assert_eq!(err.status_code, Some(422));
    }

    #[tokio::test]
    async fn test_live_status_lookup() {
        let app = Router::new().route(
            "/api/messages/:id",
            get(|Path(id): Path<String>| async move {
                Json(json!({ "id": id, "status": "delivered" }))
            }),
        );
        let base = spawn_server(app).await;

        let gateway = SimpleTextingGateway::new("secret".into(), base);
        assert_eq!(gateway.message_status("st-1").await.unwrap(), "delivered");
    }
}
