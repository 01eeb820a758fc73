//! Axum route handlers for the SMS API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::sms::pipeline::{
    check_message_status, message_history, reconcile_stale_pending, send_review_request,
    HistoryPage, MessageStatusView,
};
use crate::sms::validation::SendSmsRequest;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsResponse {
    pub success: bool,
    pub message: String,
    pub message_id: Uuid,
    pub external_message_id: String,
    pub is_mock_mode: bool,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// POST /api/sms/send
///
/// 200 with the record id on success. A gateway rejection is recorded as `failed` and
/// answered with 502 `{success: false, error, isMockMode}`.
pub async fn handle_send_sms(
    State(state): State<AppState>,
    AppJson(req): AppJson<SendSmsRequest>,
) -> Result<Response, AppError> {
    let outcome = send_review_request(
        state.store.as_ref(),
        state.shortener.as_ref(),
        state.sms.as_ref(),
        &req,
    )
    .await?;

    let response = match outcome.delivery {
        Ok(external_message_id) => {
            let message = if outcome.is_mock_mode {
                format!(
                    "Mock SMS sent successfully to {} at {} (Development Mode)",
                    outcome.customer_name, outcome.customer_phone
                )
            } else {
                format!(
                    "Review request sent successfully to {} at {}",
                    outcome.customer_name, outcome.customer_phone
                )
            };
            Json(SendSmsResponse {
                success: true,
                message,
                message_id: outcome.message_id,
                external_message_id,
                is_mock_mode: outcome.is_mock_mode,
            })
            .into_response()
        }
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "error": e.message,
                "messageId": outcome.message_id,
                "isMockMode": outcome.is_mock_mode
            })),
        )
            .into_response(),
    };

    Ok(response)
}

/// GET /api/sms/status/:messageId
pub async fn handle_message_status(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<MessageStatusView>, AppError> {
    let message_id = Uuid::parse_str(&message_id)
        .map_err(|_| AppError::NotFound("Message not found".to_string()))?;
    let view = check_message_status(state.store.as_ref(), state.sms.as_ref(), message_id).await?;
    Ok(Json(view))
}

/// GET /api/sms/history?page&limit
///
/// Unparseable paging values fall back to the defaults.
pub async fn handle_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryPage>, AppError> {
    let page = params.page.and_then(|p| p.trim().parse().ok());
    let limit = params.limit.and_then(|l| l.trim().parse().ok());
    Ok(Json(message_history(state.store.as_ref(), page, limit).await?))
}

/// POST /api/sms/reconcile
pub async fn handle_reconcile(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let reconciled =
        reconcile_stale_pending(state.store.as_ref(), state.config.stale_pending_age()).await?;
    Ok(Json(json!({ "reconciled": reconciled })))
}
