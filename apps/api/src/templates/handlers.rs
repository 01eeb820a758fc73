//! Axum route handlers for message templates and the admin default-template screen.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::models::template::MessageTemplateRow;
use crate::state::AppState;
use crate::templates::service::{self, TemplateInput};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateView {
    pub id: Uuid,
    pub name: String,
    pub content: String,
    pub description: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MessageTemplateRow> for TemplateView {
    fn from(row: MessageTemplateRow) -> Self {
        TemplateView {
            id: row.id,
            name: row.name,
            content: row.template,
            description: row.description,
            is_default: row.is_default,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminTemplateUpdate {
    pub template: Option<String>,
}

fn parse_template_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound("SMS template not found".to_string()))
}

/// GET /api/sms-templates
pub async fn handle_list_templates(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let templates: Vec<TemplateView> = state
        .store
        .list_active_templates()
        .await?
        .into_iter()
        .map(TemplateView::from)
        .collect();
    Ok(Json(json!({ "templates": templates })))
}

/// GET /api/sms-templates/:id
pub async fn handle_get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_template_id(&id)?;
    let template = state
        .store
        .find_template(id)
        .await?
        .ok_or_else(|| AppError::NotFound("SMS template not found".to_string()))?;
    Ok(Json(json!({ "template": TemplateView::from(template) })))
}

/// POST /api/sms-templates
pub async fn handle_create_template(
    State(state): State<AppState>,
    AppJson(input): AppJson<TemplateInput>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let row = service::create_template(state.store.as_ref(), input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "SMS template created successfully",
            "template": TemplateView::from(row)
        })),
    ))
}

/// PUT /api/sms-templates/:id
pub async fn handle_update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(input): AppJson<TemplateInput>,
) -> Result<Json<Value>, AppError> {
    let id = parse_template_id(&id)?;
    let row = service::update_template(state.store.as_ref(), id, input).await?;
    Ok(Json(json!({
        "success": true,
        "message": "SMS template updated successfully",
        "template": TemplateView::from(row)
    })))
}

/// DELETE /api/sms-templates/:id
pub async fn handle_delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_template_id(&id)?;
    service::delete_template(state.store.as_ref(), id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "SMS template deleted successfully"
    })))
}

/// POST /api/sms-templates/:id/default
pub async fn handle_set_default_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let id = parse_template_id(&id)?;
    let row = service::set_default_template(state.store.as_ref(), id).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Default template updated",
        "template": TemplateView::from(row)
    })))
}

/// GET /api/admin/message-template
pub async fn handle_get_admin_template(
    State(state): State<AppState>,
) -> Result<Json<Value>, AppError> {
    let row = service::admin_template(state.store.as_ref()).await?;
    Ok(Json(json!({ "template": row.template })))
}

/// PUT /api/admin/message-template
pub async fn handle_update_admin_template(
    State(state): State<AppState>,
    AppJson(req): AppJson<AdminTemplateUpdate>,
) -> Result<Json<Value>, AppError> {
    service::update_admin_template(state.store.as_ref(), req.template).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message template updated successfully"
    })))
}
