use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Delivery lifecycle of an outbound review request.
///
/// `pending → sent → delivered` or `pending → failed`. Nothing moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Failed,
    Delivered,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
            MessageStatus::Delivered => "delivered",
        }
    }

    /// Display form used by the history view ("Sent", "Failed", ...).
    pub fn label(self) -> &'static str {
        match self {
            MessageStatus::Pending => "Pending",
            MessageStatus::Sent => "Sent",
            MessageStatus::Failed => "Failed",
            MessageStatus::Delivered => "Delivered",
        }
    }

    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        matches!(
            (self, next),
            (MessageStatus::Pending, MessageStatus::Sent)
                | (MessageStatus::Pending, MessageStatus::Failed)
                | (MessageStatus::Sent, MessageStatus::Delivered)
        )
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(MessageStatus::Pending),
            "sent" => Ok(MessageStatus::Sent),
            "failed" => Ok(MessageStatus::Failed),
            "delivered" => Ok(MessageStatus::Delivered),
            other => Err(format!("unknown message status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SmsMessageRow {
    pub id: Uuid,
    pub city_id: Uuid,
    pub technician_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub message_content: String,
    pub original_url: Option<String>,
    pub shortened_url: Option<String>,
    /// Stored as text; read through `status()`.
    pub status: String,
    pub external_message_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SmsMessageRow {
    /// Rows are only ever written through `MessageStatus::as_str`, so an unknown value
    /// means the table was edited by hand; treat it as still pending.
    pub fn status(&self) -> MessageStatus {
        self.status.parse().unwrap_or(MessageStatus::Pending)
    }
}

/// A record about to be inserted in the `pending` state.
#[derive(Debug, Clone)]
pub struct NewSmsMessage {
    pub city_id: Uuid,
    pub technician_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub message_content: String,
    pub original_url: String,
    pub shortened_url: Option<String>,
}

/// History row joined with city and technician names.
#[derive(Debug, Clone, FromRow)]
pub struct SmsHistoryRow {
    pub id: Uuid,
    pub city_name: Option<String>,
    pub technician_name: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub status: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
