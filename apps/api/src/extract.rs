use axum::extract::FromRequest;

use crate::errors::AppError;

/// `axum::Json` whose rejections come back as `AppError::Validation`, so a bad body gets the
/// same `{success, error, code}` shape as every other client error.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
