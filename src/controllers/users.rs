use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::errors::ApiError;
use crate::extract::ApiJson;
use crate::middleware::{token_digest, verify_password, AuthUser};
use crate::models::User;
use crate::storage::StoreError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/token", post(obtain_token))
        .route("/user/me", get(me))
}

#[derive(Debug, Deserialize, Validate)]
struct CredentialsRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: String,
}

#[derive(Debug, Serialize)]
struct UserResponse {
    id: i64,
    email: String,
    is_staff: bool,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
}

// POST /api/user/register
async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| ApiError::Other(e.into()))?
        .map_err(|e| ApiError::Other(e.into()))?;

    let user = match User::create(&email, &password_hash, &state.db).await {
        Ok(user) => user,
        Err(e) => {
            return Err(match StoreError::from(e) {
                StoreError::UniqueViolation { .. } => {
                    ApiError::BadRequest("user with this email already exists.".to_string())
                }
                other => other.into(),
            });
        }
    };

    tracing::info!("User {} registered", user.id);
    Ok((
        StatusCode::CREATED,
        Json(UserResponse { id: user.id, email: user.email, is_staff: user.is_staff }),
    ))
}

// POST /api/user/token
async fn obtain_token(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invalid = || ApiError::BadRequest("Unable to log in with provided credentials.".to_string());

    let user = User::find_by_email(&req.email.trim().to_lowercase(), &state.db)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;
    if !verify_password(user.clone(), req.password).await? {
        return Err(invalid());
    }

    // Ключ отдаётся один раз, в БД только дайджест
    let key = Uuid::new_v4().simple().to_string();
    user.store_token_digest(&token_digest(&key), &state.db).await?;

    tracing::debug!("Token issued for user {}", user.id);
    Ok(Json(TokenResponse { token: key }))
}

// GET /api/user/me
async fn me(user: AuthUser) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.user_id,
        email: user.email,
        is_staff: user.is_staff,
    })
}
