use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageTemplateRow {
    pub id: Uuid,
    pub name: String,
    pub template: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields written when creating or editing a template. Values arrive trimmed.
#[derive(Debug, Clone)]
pub struct TemplateDraft {
    pub name: String,
    pub template: String,
    pub description: Option<String>,
    pub is_default: bool,
}
