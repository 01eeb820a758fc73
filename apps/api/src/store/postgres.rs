use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::city::CityRow;
use crate::models::sms_message::{MessageStatus, NewSmsMessage, SmsHistoryRow, SmsMessageRow};
use crate::models::technician::{TechnicianListingRow, TechnicianRow};
use crate::models::template::{MessageTemplateRow, TemplateDraft};
use crate::store::{ReviewStore, StoreResult};

/// `ReviewStore` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn find_city(&self, id: Uuid) -> StoreResult<Option<CityRow>> {
        sqlx::query_as("SELECT * FROM cities WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_active_cities(&self) -> StoreResult<Vec<CityRow>> {
        sqlx::query_as("SELECT * FROM cities WHERE is_active ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
    }

    async fn find_technician(&self, id: Uuid) -> StoreResult<Option<TechnicianRow>> {
        sqlx::query_as("SELECT * FROM technicians WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn list_active_technicians(&self) -> StoreResult<Vec<TechnicianListingRow>> {
        sqlx::query_as(
            r#"
            SELECT t.id, t.name, t.email, t.phone, t.city_id, c.name AS city_name
            FROM technicians t
            LEFT JOIN cities c ON c.id = t.city_id
            WHERE t.is_active
            ORDER BY t.name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn find_default_template(&self) -> StoreResult<Option<MessageTemplateRow>> {
        sqlx::query_as(
            "SELECT * FROM message_templates WHERE is_default AND is_active LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    async fn first_active_template(&self) -> StoreResult<Option<MessageTemplateRow>> {
        sqlx::query_as(
            "SELECT * FROM message_templates WHERE is_active ORDER BY created_at ASC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
    }

    async fn list_active_templates(&self) -> StoreResult<Vec<MessageTemplateRow>> {
        sqlx::query_as("SELECT * FROM message_templates WHERE is_active ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await
    }

    async fn find_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>> {
        sqlx::query_as("SELECT * FROM message_templates WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn template_name_taken(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool> {
        sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM message_templates
                WHERE name = $1 AND is_active AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
    }

    async fn insert_template(&self, draft: TemplateDraft) -> StoreResult<MessageTemplateRow> {
        let mut tx = self.pool.begin().await?;

        if draft.is_default {
            sqlx::query(
                "UPDATE message_templates SET is_default = FALSE, updated_at = NOW() WHERE is_default",
            )
            .execute(&mut *tx)
            .await?;
        }

        let row: MessageTemplateRow = sqlx::query_as(
            r#"
            INSERT INTO message_templates (id, name, template, description, is_default, is_active)
            VALUES ($1, $2, $3, $4, $5, TRUE)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&draft.name)
        .bind(&draft.template)
        .bind(&draft.description)
        .bind(draft.is_default)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn update_template(
        &self,
        id: Uuid,
        draft: TemplateDraft,
    ) -> StoreResult<Option<MessageTemplateRow>> {
        let mut tx = self.pool.begin().await?;

        if draft.is_default {
            sqlx::query(
                r#"
                UPDATE message_templates SET is_default = FALSE, updated_at = NOW()
                WHERE is_default AND id <> $1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let row: Option<MessageTemplateRow> = sqlx::query_as(
            r#"
            UPDATE message_templates
            SET name = $2, template = $3, description = $4, is_default = $5, updated_at = NOW()
            WHERE id = $1 AND is_active
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.template)
        .bind(&draft.description)
        .bind(draft.is_default)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping the transaction rolls back the cleared defaults.
        if row.is_some() {
            tx.commit().await?;
        }
        Ok(row)
    }

    async fn set_default_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM message_templates WHERE id = $1 AND is_active FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        if locked.is_none() {
            return Ok(None);
        }

        sqlx::query(
            r#"
            UPDATE message_templates SET is_default = FALSE, updated_at = NOW()
            WHERE is_default AND id <> $1
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        let row: MessageTemplateRow = sqlx::query_as(
            r#"
            UPDATE message_templates SET is_default = TRUE, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        info!("Template {id} is now the default");
        Ok(Some(row))
    }

    async fn deactivate_template(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE message_templates
            SET is_active = FALSE, is_default = FALSE, updated_at = NOW()
            WHERE id = $1 AND is_active
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_sms_message(&self, message: NewSmsMessage) -> StoreResult<SmsMessageRow> {
        sqlx::query_as(
            r#"
            INSERT INTO sms_messages
                (id, city_id, technician_id, customer_name, customer_phone,
                 message_content, original_url, shortened_url, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.city_id)
        .bind(message.technician_id)
        .bind(&message.customer_name)
        .bind(&message.customer_phone)
        .bind(&message.message_content)
        .bind(&message.original_url)
        .bind(&message.shortened_url)
        .bind(MessageStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
    }

    async fn find_sms_message(&self, id: Uuid) -> StoreResult<Option<SmsMessageRow>> {
        sqlx::query_as("SELECT * FROM sms_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        external_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sms_messages
            SET status = $2, external_message_id = $3, sent_at = $4, updated_at = NOW()
            WHERE id = $1 AND status = $5
            "#,
        )
        .bind(id)
        .bind(MessageStatus::Sent.as_str())
        .bind(external_message_id)
        .bind(sent_at)
        .bind(MessageStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sms_messages
            SET status = $2, error_message = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(MessageStatus::Failed.as_str())
        .bind(error_message)
        .bind(MessageStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sms_messages
            SET status = $2, delivered_at = $3, updated_at = NOW()
            WHERE id = $1 AND status = $4
            "#,
        )
        .bind(id)
        .bind(MessageStatus::Delivered.as_str())
        .bind(delivered_at)
        .bind(MessageStatus::Sent.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_sms_history(&self, offset: i64, limit: i64) -> StoreResult<Vec<SmsHistoryRow>> {
        sqlx::query_as(
            r#"
            SELECT m.id, c.name AS city_name, t.name AS technician_name,
                   m.customer_name, m.customer_phone, m.status, m.sent_at, m.created_at
            FROM sms_messages m
            LEFT JOIN cities c ON c.id = m.city_id
            LEFT JOIN technicians t ON t.id = m.technician_id
            ORDER BY m.created_at DESC
            OFFSET $1 LIMIT $2
            "#,
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn count_sms_messages(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM sms_messages")
            .fetch_one(&self.pool)
            .await
    }

    async fn fail_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        error_message: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sms_messages
            SET status = $1, error_message = $2, updated_at = NOW()
            WHERE status = $3 AND created_at < $4
            "#,
        )
        .bind(MessageStatus::Failed.as_str())
        .bind(error_message)
        .bind(MessageStatus::Pending.as_str())
        .bind(created_before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
