//! Persistence seam for reference data, templates and SMS records.
//!
//! `AppState` holds an `Arc<dyn ReviewStore>`. Production uses `PgStore`; tests use the
//! in-memory store in `memory`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::city::CityRow;
use crate::models::sms_message::{NewSmsMessage, SmsHistoryRow, SmsMessageRow};
use crate::models::technician::{TechnicianListingRow, TechnicianRow};
use crate::models::template::{MessageTemplateRow, TemplateDraft};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    // ── Reference data ──────────────────────────────────────────────────────

    async fn find_city(&self, id: Uuid) -> StoreResult<Option<CityRow>>;

    async fn list_active_cities(&self) -> StoreResult<Vec<CityRow>>;

    async fn find_technician(&self, id: Uuid) -> StoreResult<Option<TechnicianRow>>;

    async fn list_active_technicians(&self) -> StoreResult<Vec<TechnicianListingRow>>;

    // ── Message templates ───────────────────────────────────────────────────

    /// The template flagged `is_default` that is also active.
    async fn find_default_template(&self) -> StoreResult<Option<MessageTemplateRow>>;

    /// Oldest active template, used when no default is set.
    async fn first_active_template(&self) -> StoreResult<Option<MessageTemplateRow>>;

    /// Active templates, newest first.
    async fn list_active_templates(&self) -> StoreResult<Vec<MessageTemplateRow>>;

    /// Active template by id.
    async fn find_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>>;

    async fn template_name_taken(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool>;

    /// Inserts a template. When the draft is default, every other default is cleared in
    /// the same transaction.
    async fn insert_template(&self, draft: TemplateDraft) -> StoreResult<MessageTemplateRow>;

    /// Rewrites an active template. Same default handling as `insert_template`.
    async fn update_template(
        &self,
        id: Uuid,
        draft: TemplateDraft,
    ) -> StoreResult<Option<MessageTemplateRow>>;

    /// Makes `id` the only default template. Returns `None` if it is missing or inactive.
    async fn set_default_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>>;

    /// Soft delete: marks the template inactive and drops its default flag.
    async fn deactivate_template(&self, id: Uuid) -> StoreResult<bool>;

    // ── SMS records ─────────────────────────────────────────────────────────

    async fn insert_sms_message(&self, message: NewSmsMessage) -> StoreResult<SmsMessageRow>;

    async fn find_sms_message(&self, id: Uuid) -> StoreResult<Option<SmsMessageRow>>;

    /// `pending → sent`. Returns false when the record was not pending.
    async fn mark_sent(
        &self,
        id: Uuid,
        external_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// `pending → failed`. Returns false when the record was not pending.
    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StoreResult<bool>;

    /// `sent → delivered`. Returns false when the record was not sent.
    async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<bool>;

    /// Newest first.
    async fn list_sms_history(&self, offset: i64, limit: i64) -> StoreResult<Vec<SmsHistoryRow>>;

    async fn count_sms_messages(&self) -> StoreResult<i64>;

    /// Fails every record still `pending` that was created before `created_before`.
    /// Returns the number of records changed.
    async fn fail_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        error_message: &str,
    ) -> StoreResult<u64>;
}
