//! Standalone shorten/expand endpoints over the same shortener the send flow uses.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::extract::AppJson;
use crate::sms::shortener::{is_valid_url, ShortenError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ShortenRequest {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandRequest {
    pub short_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenResponse {
    pub success: bool,
    pub short_url: String,
    pub long_url: String,
    pub id: Option<String>,
}

fn upstream(e: ShortenError) -> AppError {
    match e {
        ShortenError::Api { message, .. } => AppError::Upstream(message),
        other => AppError::Upstream(other.to_string()),
    }
}

/// POST /api/url/shorten
pub async fn handle_shorten(
    State(state): State<AppState>,
    AppJson(req): AppJson<ShortenRequest>,
) -> Result<Json<ShortenResponse>, AppError> {
    let url = req
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("URL is required".to_string()))?;
    if !is_valid_url(&url) {
        return Err(AppError::Validation("Invalid URL format".to_string()));
    }

    let link = state.shortener.shorten(&url).await.map_err(upstream)?;
    Ok(Json(ShortenResponse {
        success: true,
        short_url: link.short_url,
        long_url: link.long_url,
        id: link.id,
    }))
}

/// POST /api/url/expand
pub async fn handle_expand(
    State(state): State<AppState>,
    AppJson(req): AppJson<ExpandRequest>,
) -> Result<Json<Value>, AppError> {
    let short_url = req
        .short_url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Short URL is required".to_string()))?;

    let link = state.shortener.expand(&short_url).await.map_err(upstream)?;
    Ok(Json(json!({
        "success": true,
        "longUrl": link.long_url,
        "shortUrl": link.short_url
    })))
}
