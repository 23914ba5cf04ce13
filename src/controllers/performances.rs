use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::catalog::{PerformanceDetail, PerformanceFilter, PerformanceListItem};
use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{AdminUser, AuthUser};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/performances", get(list_performances).post(create_performance))
        .route("/performances/{id}", get(get_performance))
}

#[derive(Debug, Deserialize)]
struct PerformanceQuery {
    date: Option<String>,
    play: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatePerformanceRequest {
    play: i64,
    theatre_hall: i64,
    show_time: DateTime<Utc>,
}

fn parse_filter(query: PerformanceQuery) -> Result<PerformanceFilter, ApiError> {
    let date = query
        .date
        .filter(|d| !d.is_empty())
        .map(|d| {
            NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                .map_err(|_| ApiError::BadRequest(format!("date must be YYYY-MM-DD, got {d:?}")))
        })
        .transpose()?;
    let play = query
        .play
        .filter(|p| !p.is_empty())
        .map(|p| {
            p.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("play must be an id, got {p:?}")))
        })
        .transpose()?;
    Ok(PerformanceFilter { date, play })
}

// GET /api/performances
async fn list_performances(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(query): Query<PerformanceQuery>,
) -> Result<Json<Vec<PerformanceListItem>>, ApiError> {
    let filter = parse_filter(query)?;
    Ok(Json(state.catalog.list_performances(&filter).await?))
}

// GET /api/performances/{id}
async fn get_performance(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<PerformanceDetail>, ApiError> {
    state
        .catalog
        .get_performance_detail(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound { resource: "Performance", id })
}

// POST /api/performances
async fn create_performance(
    State(state): State<Arc<AppState>>,
    AdminUser(_admin): AdminUser,
    ApiJson(req): ApiJson<CreatePerformanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let performance = state
        .catalog
        .create_performance(req.play, req.theatre_hall, req.show_time)
        .await?;
    Ok((StatusCode::CREATED, Json(performance)))
}
