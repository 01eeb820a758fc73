//! In-memory `ReviewStore` for tests. Mirrors the guarded updates of `PgStore`.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::models::city::CityRow;
use crate::models::sms_message::{MessageStatus, NewSmsMessage, SmsHistoryRow, SmsMessageRow};
use crate::models::technician::{TechnicianListingRow, TechnicianRow};
use crate::models::template::{MessageTemplateRow, TemplateDraft};
use crate::store::{ReviewStore, StoreResult};

#[derive(Default)]
struct Tables {
    cities: Vec<CityRow>,
    technicians: Vec<TechnicianRow>,
    templates: Vec<MessageTemplateRow>,
    messages: Vec<SmsMessageRow>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_city(&self, name: &str, link: &str, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().cities.push(CityRow {
            id,
            name: name.to_string(),
            google_review_link: link.to_string(),
            is_active,
            created_at: Utc::now(),
        });
        id
    }

    pub fn add_technician(&self, name: &str, city_id: Uuid, is_active: bool) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().technicians.push(TechnicianRow {
            id,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone: "404-555-0000".to_string(),
            city_id,
            is_active,
            created_at: Utc::now(),
        });
        id
    }

    /// Inserts a template with an explicit age so ordering tests are deterministic.
    pub fn add_template(&self, name: &str, body: &str, is_default: bool, age_secs: i64) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = Utc::now() - Duration::seconds(age_secs);
        self.tables.lock().unwrap().templates.push(MessageTemplateRow {
            id,
            name: name.to_string(),
            template: body.to_string(),
            description: None,
            is_default,
            is_active: true,
            created_at,
            updated_at: created_at,
        });
        id
    }

    pub fn messages(&self) -> Vec<SmsMessageRow> {
        self.tables.lock().unwrap().messages.clone()
    }

    pub fn templates(&self) -> Vec<MessageTemplateRow> {
        self.tables.lock().unwrap().templates.clone()
    }

    /// Ages a stored message, for history ordering and reconciliation tests.
    pub fn backdate_message(&self, id: Uuid, secs: i64) {
        let mut tables = self.tables.lock().unwrap();
        if let Some(m) = tables.messages.iter_mut().find(|m| m.id == id) {
            m.created_at = m.created_at - Duration::seconds(secs);
        }
    }

    fn transition(
        &self,
        id: Uuid,
        next: MessageStatus,
        apply: impl FnOnce(&mut SmsMessageRow),
    ) -> bool {
        let mut tables = self.tables.lock().unwrap();
        match tables.messages.iter_mut().find(|m| m.id == id) {
            Some(m) if m.status().can_transition_to(next) => {
                m.status = next.as_str().to_string();
                m.updated_at = Utc::now();
                apply(m);
                true
            }
            _ => false,
        }
    }
}

fn clear_defaults(templates: &mut [MessageTemplateRow], except: Option<Uuid>) {
    for t in templates.iter_mut() {
        if t.is_default && Some(t.id) != except {
            t.is_default = false;
            t.updated_at = Utc::now();
        }
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn find_city(&self, id: Uuid) -> StoreResult<Option<CityRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.cities.iter().find(|c| c.id == id).cloned())
    }

    async fn list_active_cities(&self) -> StoreResult<Vec<CityRow>> {
        let tables = self.tables.lock().unwrap();
        let mut cities: Vec<CityRow> = tables.cities.iter().filter(|c| c.is_active).cloned().collect();
        cities.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cities)
    }

    async fn find_technician(&self, id: Uuid) -> StoreResult<Option<TechnicianRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.technicians.iter().find(|t| t.id == id).cloned())
    }

    async fn list_active_technicians(&self) -> StoreResult<Vec<TechnicianListingRow>> {
        let tables = self.tables.lock().unwrap();
        let mut listing: Vec<TechnicianListingRow> = tables
            .technicians
            .iter()
            .filter(|t| t.is_active)
            .map(|t| TechnicianListingRow {
                id: t.id,
                name: t.name.clone(),
                email: t.email.clone(),
                phone: t.phone.clone(),
                city_id: t.city_id,
                city_name: tables
                    .cities
                    .iter()
                    .find(|c| c.id == t.city_id)
                    .map(|c| c.name.clone()),
            })
            .collect();
        listing.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    async fn find_default_template(&self) -> StoreResult<Option<MessageTemplateRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .templates
            .iter()
            .find(|t| t.is_default && t.is_active)
            .cloned())
    }

    async fn first_active_template(&self) -> StoreResult<Option<MessageTemplateRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .templates
            .iter()
            .filter(|t| t.is_active)
            .min_by_key(|t| t.created_at)
            .cloned())
    }

    async fn list_active_templates(&self) -> StoreResult<Vec<MessageTemplateRow>> {
        let tables = self.tables.lock().unwrap();
        let mut templates: Vec<MessageTemplateRow> =
            tables.templates.iter().filter(|t| t.is_active).cloned().collect();
        templates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(templates)
    }

    async fn find_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .templates
            .iter()
            .find(|t| t.id == id && t.is_active)
            .cloned())
    }

    async fn template_name_taken(&self, name: &str, exclude: Option<Uuid>) -> StoreResult<bool> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .templates
            .iter()
            .any(|t| t.is_active && t.name == name && Some(t.id) != exclude))
    }

    async fn insert_template(&self, draft: TemplateDraft) -> StoreResult<MessageTemplateRow> {
        let mut tables = self.tables.lock().unwrap();
        if draft.is_default {
            clear_defaults(&mut tables.templates, None);
        }
        let now = Utc::now();
        let row = MessageTemplateRow {
            id: Uuid::new_v4(),
            name: draft.name,
            template: draft.template,
            description: draft.description,
            is_default: draft.is_default,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        tables.templates.push(row.clone());
        Ok(row)
    }

    async fn update_template(
        &self,
        id: Uuid,
        draft: TemplateDraft,
    ) -> StoreResult<Option<MessageTemplateRow>> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.templates.iter().any(|t| t.id == id && t.is_active) {
            return Ok(None);
        }
        if draft.is_default {
            clear_defaults(&mut tables.templates, Some(id));
        }
        let row = tables.templates.iter_mut().find(|t| t.id == id);
        Ok(row.map(|t| {
            t.name = draft.name;
            t.template = draft.template;
            t.description = draft.description;
            t.is_default = draft.is_default;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn set_default_template(&self, id: Uuid) -> StoreResult<Option<MessageTemplateRow>> {
        let mut tables = self.tables.lock().unwrap();
        if !tables.templates.iter().any(|t| t.id == id && t.is_active) {
            return Ok(None);
        }
        clear_defaults(&mut tables.templates, Some(id));
        let row = tables.templates.iter_mut().find(|t| t.id == id);
        Ok(row.map(|t| {
            t.is_default = true;
            t.updated_at = Utc::now();
            t.clone()
        }))
    }

    async fn deactivate_template(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables.templates.iter_mut().find(|t| t.id == id && t.is_active) {
            Some(t) => {
                t.is_active = false;
                t.is_default = false;
                t.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_sms_message(&self, message: NewSmsMessage) -> StoreResult<SmsMessageRow> {
        let now = Utc::now();
        let row = SmsMessageRow {
            id: Uuid::new_v4(),
            city_id: message.city_id,
            technician_id: message.technician_id,
            customer_name: message.customer_name,
            customer_phone: message.customer_phone,
            message_content: message.message_content,
            original_url: Some(message.original_url),
            shortened_url: message.shortened_url,
            status: MessageStatus::Pending.as_str().to_string(),
            external_message_id: None,
            error_message: None,
            sent_at: None,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().unwrap().messages.push(row.clone());
        Ok(row)
    }

    async fn find_sms_message(&self, id: Uuid) -> StoreResult<Option<SmsMessageRow>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.messages.iter().find(|m| m.id == id).cloned())
    }

    async fn mark_sent(
        &self,
        id: Uuid,
        external_message_id: &str,
        sent_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        Ok(self.transition(id, MessageStatus::Sent, |m| {
            m.external_message_id = Some(external_message_id.to_string());
            m.sent_at = Some(sent_at);
        }))
    }

    async fn mark_failed(&self, id: Uuid, error_message: &str) -> StoreResult<bool> {
        Ok(self.transition(id, MessageStatus::Failed, |m| {
            m.error_message = Some(error_message.to_string());
        }))
    }

    async fn mark_delivered(&self, id: Uuid, delivered_at: DateTime<Utc>) -> StoreResult<bool> {
        Ok(self.transition(id, MessageStatus::Delivered, |m| {
            m.delivered_at = Some(delivered_at);
        }))
    }

    async fn list_sms_history(&self, offset: i64, limit: i64) -> StoreResult<Vec<SmsHistoryRow>> {
        let tables = self.tables.lock().unwrap();
        let mut messages: Vec<&SmsMessageRow> = tables.messages.iter().collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|m| SmsHistoryRow {
                id: m.id,
                city_name: tables
                    .cities
                    .iter()
                    .find(|c| c.id == m.city_id)
                    .map(|c| c.name.clone()),
                technician_name: tables
                    .technicians
                    .iter()
                    .find(|t| t.id == m.technician_id)
                    .map(|t| t.name.clone()),
                customer_name: m.customer_name.clone(),
                customer_phone: m.customer_phone.clone(),
                status: m.status.clone(),
                sent_at: m.sent_at,
                created_at: m.created_at,
            })
            .collect())
    }

    async fn count_sms_messages(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().unwrap().messages.len() as i64)
    }

    async fn fail_stale_pending(
        &self,
        created_before: DateTime<Utc>,
        error_message: &str,
    ) -> StoreResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let mut changed = 0;
        for m in tables.messages.iter_mut() {
            if m.status() == MessageStatus::Pending && m.created_at < created_before {
                m.status = MessageStatus::Failed.as_str().to_string();
                m.error_message = Some(error_message.to_string());
                m.updated_at = Utc::now();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, is_default: bool) -> TemplateDraft {
        TemplateDraft {
            name: name.to_string(),
            template: "Hi {customerName}".to_string(),
            description: None,
            is_default,
        }
    }

    fn default_count(store: &MemoryStore) -> usize {
        store
            .templates()
            .iter()
            .filter(|t| t.is_default && t.is_active)
            .count()
    }

    #[tokio::test]
    async fn test_set_default_leaves_exactly_one_default() {
        let store = MemoryStore::new();
        let first = store.add_template("First", "a", true, 60);
        let second = store.add_template("Second", "b", false, 30);

        let row = store.set_default_template(second).await.unwrap().unwrap();
        assert!(row.is_default);
        assert_eq!(default_count(&store), 1);
        assert_eq!(
            store.find_default_template().await.unwrap().unwrap().id,
            second
        );
        assert!(!store.templates().iter().find(|t| t.id == first).unwrap().is_default);
    }

    #[tokio::test]
    async fn test_set_default_on_inactive_template_is_none() {
        let store = MemoryStore::new();
        let id = store.add_template("Old", "a", false, 0);
        assert!(store.deactivate_template(id).await.unwrap());
        assert!(store.set_default_template(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_inserting_default_clears_previous() {
        let store = MemoryStore::new();
        store.add_template("First", "a", true, 60);
        store.insert_template(draft("Second", true)).await.unwrap();
        assert_eq!(default_count(&store), 1);
        assert_eq!(
            store.find_default_template().await.unwrap().unwrap().name,
            "Second"
        );
    }

    #[tokio::test]
    async fn test_deactivating_default_drops_flag() {
        let store = MemoryStore::new();
        let id = store.add_template("Only", "a", true, 0);
        store.deactivate_template(id).await.unwrap();
        assert!(store.find_default_template().await.unwrap().is_none());
        assert_eq!(default_count(&store), 0);
    }

    #[tokio::test]
    async fn test_guarded_transitions() {
        let store = MemoryStore::new();
        let city = store.add_city("Atlanta", "https://g.page/atl", true);
        let tech = store.add_technician("Mike Johnson", city, true);
        let row = store
            .insert_sms_message(NewSmsMessage {
                city_id: city,
                technician_id: tech,
                customer_name: "John".to_string(),
                customer_phone: "404-555-1234".to_string(),
                message_content: "hi".to_string(),
                original_url: "https://g.page/atl".to_string(),
                shortened_url: None,
            })
            .await
            .unwrap();

        assert!(!store.mark_delivered(row.id, Utc::now()).await.unwrap());
        assert!(store.mark_sent(row.id, "ext-1", Utc::now()).await.unwrap());
        assert!(!store.mark_failed(row.id, "late failure").await.unwrap());
        assert!(store.mark_delivered(row.id, Utc::now()).await.unwrap());

        let stored = store.find_sms_message(row.id).await.unwrap().unwrap();
        assert_eq!(stored.status(), MessageStatus::Delivered);
        assert!(stored.error_message.is_none());
    }
}
