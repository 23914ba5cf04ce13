use axum::extract::FromRequest;

use crate::errors::ApiError;

/// `Json`, ошибки разбора которого отдаются как [`ApiError`] (400 с JSON-телом).
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
