use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CityRow {
    pub id: Uuid,
    pub name: String,
    pub google_review_link: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
