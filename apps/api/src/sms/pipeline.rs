//! The review-request workflow: validate, look up, shorten, render, record, send.
//!
//! Strictly sequential. The shortened link feeds the message body, so shortening finishes
//! before the gateway call starts. No step is retried.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::sms_message::{MessageStatus, NewSmsMessage, SmsHistoryRow};
use crate::sms::gateway::{GatewayError, SmsGateway};
use crate::sms::shortener::UrlShortener;
use crate::sms::template::{render_template, TemplateValues};
use crate::sms::validation::{mask_phone, validate_send_request, SendSmsRequest};
use crate::store::ReviewStore;

pub const STALE_PENDING_ERROR: &str = "Delivery outcome unknown: send did not complete";

const DEFAULT_HISTORY_LIMIT: i64 = 10;
const MAX_HISTORY_LIMIT: i64 = 100;

/// Result of a send that got as far as the gateway.
#[derive(Debug)]
pub struct SendOutcome {
    pub message_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub message_content: String,
    pub is_mock_mode: bool,
    /// External id on success, gateway error on failure.
    pub delivery: Result<String, GatewayError>,
}

/// Runs the full send workflow.
///
/// Validation, lookup and storage problems come back as `Err`. A gateway failure is a
/// completed send with a `failed` record, so it comes back as `Ok` with `delivery: Err`.
pub async fn send_review_request(
    store: &dyn ReviewStore,
    shortener: &dyn UrlShortener,
    gateway: &dyn SmsGateway,
    req: &SendSmsRequest,
) -> Result<SendOutcome, AppError> {
    let input = validate_send_request(req)?;

    let city = store
        .find_city(input.city_id)
        .await?
        .filter(|c| c.is_active)
        .ok_or_else(|| AppError::NotFound("City not found or inactive".to_string()))?;

    let technician = store
        .find_technician(input.technician_id)
        .await?
        .filter(|t| t.is_active)
        .ok_or_else(|| AppError::NotFound("Technician not found or inactive".to_string()))?;

    let template = store.find_default_template().await?.ok_or_else(|| {
        AppError::Configuration("No default message template configured".to_string())
    })?;

    info!(
        "Sending review request: city={}, technician={}, template={}",
        city.name, technician.name, template.name
    );

    let shortened_url = match shortener.shorten(&city.google_review_link).await {
        Ok(link) => {
            info!("Review link shortened to {}", link.short_url);
            Some(link.short_url)
        }
        Err(e) => {
            warn!("URL shortening failed, using original link: {e}");
            None
        }
    };
    let review_link = shortened_url
        .as_deref()
        .unwrap_or(&city.google_review_link);

    let message_content = render_template(
        &template.template,
        &TemplateValues {
            customer_name: &input.customer_name,
            technician_name: &technician.name,
            review_link,
            city_name: &city.name,
        },
    );

    let customer_name = input.customer_name.trim().to_string();
    let customer_phone = input.customer_phone.trim().to_string();

    let record = store
        .insert_sms_message(NewSmsMessage {
            city_id: city.id,
            technician_id: technician.id,
            customer_name: customer_name.clone(),
            customer_phone: customer_phone.clone(),
            message_content: message_content.clone(),
            original_url: city.google_review_link.clone(),
            shortened_url,
        })
        .await?;

    info!(
        "Created pending SMS record {} for {}",
        record.id,
        mask_phone(&customer_phone)
    );

    let delivery = match gateway.send_sms(&input.customer_phone, &message_content).await {
        Ok(receipt) => {
            if !store
                .mark_sent(record.id, &receipt.external_message_id, Utc::now())
                .await?
            {
                warn!("SMS record {} was no longer pending when marking sent", record.id);
            }
            info!(
                "SMS record {} sent as {}",
                record.id, receipt.external_message_id
            );
            Ok(receipt.external_message_id)
        }
        Err(e) => {
            if !store.mark_failed(record.id, &e.message).await? {
                warn!("SMS record {} was no longer pending when marking failed", record.id);
            }
            warn!("SMS record {} failed: {}", record.id, e.message);
            Err(e)
        }
    };

    Ok(SendOutcome {
        message_id: record.id,
        customer_name,
        customer_phone,
        message_content,
        is_mock_mode: gateway.is_mock_mode(),
        delivery,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageStatusView {
    pub message_id: Uuid,
    pub status: MessageStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Current status of a stored message, asking the gateway first when it is `sent`.
///
/// A failed gateway lookup is logged and the stored status is returned.
pub async fn check_message_status(
    store: &dyn ReviewStore,
    gateway: &dyn SmsGateway,
    message_id: Uuid,
) -> Result<MessageStatusView, AppError> {
    let mut message = store
        .find_sms_message(message_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

    if let (MessageStatus::Sent, Some(external_id)) =
        (message.status(), message.external_message_id.clone())
    {
        match gateway.message_status(&external_id).await {
            Ok(remote) => match remote.parse::<MessageStatus>() {
                Ok(MessageStatus::Delivered) => {
                    let now = Utc::now();
                    if store.mark_delivered(message.id, now).await? {
                        info!("SMS record {} delivered", message.id);
                        message.status = MessageStatus::Delivered.as_str().to_string();
                        message.delivered_at = Some(now);
                    }
                }
                Ok(other) if other != MessageStatus::Sent => {
                    warn!(
                        "Gateway reported '{other}' for sent record {}; not a permitted transition",
                        message.id
                    );
                }
                _ => {}
            },
            Err(e) => warn!("Status lookup for {external_id} failed: {e}"),
        }
    }

    Ok(MessageStatusView {
        message_id: message.id,
        status: message.status(),
        sent_at: message.sent_at,
        delivered_at: message.delivered_at,
        error_message: message.error_message,
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: Uuid,
    pub city_name: String,
    pub technician_name: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: String,
    pub sent_at: DateTime<Utc>,
}

impl From<SmsHistoryRow> for HistoryEntry {
    fn from(row: SmsHistoryRow) -> Self {
        let status = row
            .status
            .parse::<MessageStatus>()
            .map(|s| s.label().to_string())
            .unwrap_or(row.status);
        HistoryEntry {
            id: row.id,
            city_name: row.city_name.unwrap_or_else(|| "Unknown City".to_string()),
            technician_name: row
                .technician_name
                .unwrap_or_else(|| "Unknown Technician".to_string()),
            customer_name: row.customer_name,
            customer_phone: mask_phone(&row.customer_phone),
            status,
            sent_at: row.sent_at.unwrap_or(row.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub messages: Vec<HistoryEntry>,
    pub total: i64,
    pub total_count: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

/// Normalizes raw `page`/`limit` query values: page ≥ 1, limit in 1..=100, default 10.
pub fn history_window(page: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let page = page.filter(|p| *p >= 1).unwrap_or(1);
    let limit = limit
        .filter(|l| *l >= 1)
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);
    (page, limit)
}

pub async fn message_history(
    store: &dyn ReviewStore,
    page: Option<i64>,
    limit: Option<i64>,
) -> Result<HistoryPage, AppError> {
    let (page, limit) = history_window(page, limit);
    let offset = (page - 1).saturating_mul(limit);

    let rows = store.list_sms_history(offset, limit).await?;
    let total = store.count_sms_messages().await?;
    let total_pages = (total + limit - 1) / limit;

    info!(
        "SMS history: page {page}, limit {limit}, {} of {total} messages",
        rows.len()
    );

    Ok(HistoryPage {
        messages: rows.into_iter().map(HistoryEntry::from).collect(),
        total,
        total_count: total,
        current_page: page,
        total_pages,
    })
}

/// Marks records stuck in `pending` for longer than `max_age` as `failed`.
///
/// A record stays pending only if the process stopped between the gateway call and the
/// status write, so whether the customer got the text is unknown.
pub async fn reconcile_stale_pending(
    store: &dyn ReviewStore,
    max_age: Duration,
) -> Result<u64, AppError> {
    let cutoff = Utc::now() - max_age;
    let reconciled = store
        .fail_stale_pending(cutoff, STALE_PENDING_ERROR)
        .await?;
    if reconciled > 0 {
        warn!("Reconciled {reconciled} SMS records left pending since before {cutoff}");
    }
    Ok(reconciled)
}
