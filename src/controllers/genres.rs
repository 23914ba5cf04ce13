use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use validator::Validate;

use crate::cache::catalog::GENRES_KEY;
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::Genre;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/genres", get(list_genres).post(create_genre))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateGenreRequest {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has between 1 and 100 characters."))]
    name: String,
}

// GET /api/genres
async fn list_genres(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<Vec<Genre>>, ApiError> {
    Ok(Json(state.cache.genres().await?))
}

// POST /api/genres
async fn create_genre(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiJson(req): ApiJson<CreateGenreRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let genre = state.catalog.create_genre(req.name.trim()).await?;
    state.cache.invalidate(GENRES_KEY).await;
    Ok((StatusCode::CREATED, Json(genre)))
}
