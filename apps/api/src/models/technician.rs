use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TechnicianRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Active technician joined with the owning city's name for list views.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TechnicianListingRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city_id: Uuid,
    pub city_name: Option<String>,
}
