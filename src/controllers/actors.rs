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

use crate::cache::catalog::ACTORS_KEY;
use crate::catalog::ActorView;
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AdminUser, AuthUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/actors", get(list_actors).post(create_actor))
}

#[derive(Debug, Deserialize, Validate)]
struct CreateActorRequest {
    #[validate(length(min = 1, max = 100))]
    first_name: String,
    #[validate(length(min = 1, max = 100))]
    last_name: String,
}

// GET /api/actors
async fn list_actors(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<Json<Vec<ActorView>>, ApiError> {
    Ok(Json(state.cache.actors().await?))
}

// POST /api/actors
async fn create_actor(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiJson(req): ApiJson<CreateActorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let actor = state
        .catalog
        .create_actor(req.first_name.trim(), req.last_name.trim())
        .await?;
    state.cache.invalidate(ACTORS_KEY).await;
    Ok((StatusCode::CREATED, Json(actor)))
}
