//! Read-only city and technician listings used to populate the send form.

use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityView {
    pub id: Uuid,
    pub name: String,
    pub google_review_link: String,
}

#[derive(Debug, Serialize)]
pub struct CityList {
    pub cities: Vec<CityView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicianView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city_id: Uuid,
    pub city_name: String,
}

#[derive(Debug, Serialize)]
pub struct TechnicianList {
    pub technicians: Vec<TechnicianView>,
}

/// GET /api/cities
pub async fn handle_list_cities(State(state): State<AppState>) -> Result<Json<CityList>, AppError> {
    let cities = state
        .store
        .list_active_cities()
        .await?
        .into_iter()
        .map(|c| CityView {
            id: c.id,
            name: c.name,
            google_review_link: c.google_review_link,
        })
        .collect();
    Ok(Json(CityList { cities }))
}

/// GET /api/technicians
pub async fn handle_list_technicians(
    State(state): State<AppState>,
) -> Result<Json<TechnicianList>, AppError> {
    let technicians = state
        .store
        .list_active_technicians()
        .await?
        .into_iter()
        .map(|t| TechnicianView {
            id: t.id,
            name: t.name,
            email: t.email,
            phone: t.phone,
            city_id: t.city_id,
            city_name: t.city_name.unwrap_or_else(|| "Unknown City".to_string()),
        })
        .collect();
    Ok(Json(TechnicianList { technicians }))
}
