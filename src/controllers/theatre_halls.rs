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

use crate::cache::catalog::THEATRE_HALLS_KEY;
use crate::catalog::TheatreHallView;
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AdminUser, AuthUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/theatre_halls", get(list_theatre_halls).post(create_theatre_hall))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateTheatreHallRequest {
    #[validate(length(min = 1, max = 100))]
    name: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    row: i32,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
    seats_in_row: i32,
}

// GET /api/theatre_halls
async fn list_theatre_halls(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<Vec<TheatreHallView>>, ApiError> {
    Ok(Json(state.cache.theatre_halls().await?))
}

// POST /api/theatre_halls
async fn create_theatre_hall(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiJson(req): ApiJson<CreateTheatreHallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let hall = state
        .catalog
        .create_theatre_hall(req.name.trim(), req.row, req.seats_in_row)
        .await?;
    state.cache.invalidate(THEATRE_HALLS_KEY).await;
    tracing::info!("Theatre hall {} created with capacity {}", hall.id, hall.capacity);
    Ok((StatusCode::CREATED, Json(hall)))
}
