use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::errors::ApiError;
use crate::models::User;

/// Аутентифицированный пользователь. Передаётся в ядро бронирования явно.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub is_staff: bool,
}

impl From<&User> for AuthUser {
    fn from(user: &User) -> Self {
        AuthUser {
            user_id: user.id,
            email: user.email.clone(),
            is_staff: user.is_staff,
        }
    }
}

/// Пользователь с правами персонала (создание записей каталога).
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Credentials {
    Token(String),
    Basic { email: String, password: String },
}

// "Token <key>" или "Basic base64(email:password)"
fn parse_authorization(value: &str) -> Option<Credentials> {
    if let Some(key) = value.strip_prefix("Token ") {
        let key = key.trim();
        return (!key.is_empty()).then(|| Credentials::Token(key.to_string()));
    }

    let encoded = value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;
    let (email, password) = credentials.split_once(':')?;
    Some(Credentials::Basic {
        email: email.to_string(),
        password: password.to_string(),
    })
}

/// Хранится только sha256 от токена
pub fn token_digest(key: &str) -> String {
    format!("{:x}", Sha256::digest(key.as_bytes()))
}

/// bcrypt тяжёлый, поэтому проверяем вне async-потоков
pub async fn verify_password(user: User, password: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || user.verify_password(&password))
        .await
        .map_err(|e| ApiError::Other(e.into()))
}

impl FromRequestParts<Arc<crate::AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>
    ) -> Result<Self, Self::Rejection> {
        let credentials = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_authorization)
            .ok_or(ApiError::Unauthenticated)?;

        match credentials {
            Credentials::Token(key) => {
                let digest = token_digest(&key);
                if let Some(user) = state.cache.get_cached_auth_user(&digest).await {
                    return Ok(user);
                }

                // Промах или устаревшая запись: права и активность берём из БД
                let Some(user) = User::find_by_token_digest(&digest, &state.db).await? else {
                    state.cache.forget_auth_user(&digest).await;
                    return Err(ApiError::Unauthenticated);
                };
                let auth_user = AuthUser::from(&user);

                if let Err(e) = state
                    .cache
                    .cache_auth_user(&digest, &auth_user, state.config.redis.auth_cache_ttl_seconds)
                    .await
                {
                    tracing::warn!("Failed to cache auth user {}: {}", auth_user.user_id, e);
                }
                Ok(auth_user)
            }
            Credentials::Basic { email, password } => {
                let user = User::find_by_email(&email, &state.db)
                    .await?
                    .filter(|u| u.is_active)
                    .ok_or(ApiError::Unauthenticated)?;
                let auth_user = AuthUser::from(&user);

                if !verify_password(user, password).await? {
                    return Err(ApiError::Unauthenticated);
                }
                Ok(auth_user)
            }
        }
    }
}

impl FromRequestParts<Arc<crate::AppState>> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_staff {
            return Err(ApiError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_token_scheme() {
        assert_eq!(
            parse_authorization("Token 9944b09199c62bcf"),
            Some(Credentials::Token("9944b09199c62bcf".into()))
        );
        assert_eq!(parse_authorization("Token   "), None);
    }

    #[test]
    fn parses_basic_scheme() {
        let encoded = general_purpose::STANDARD.encode("test@gmail.com:pa:ss");
        assert_eq!(
            parse_authorization(&format!("Basic {encoded}")),
            Some(Credentials::Basic {
                email: "test@gmail.com".into(),
                password: "pa:ss".into(),
            })
        );
    }

    #[test]
    fn rejects_unknown_or_broken_headers() {
        assert_eq!(parse_authorization("Bearer abc"), None);
        assert_eq!(parse_authorization("Basic !!!not-base64"), None);
        let no_colon = general_purpose::STANDARD.encode("just-email");
        assert_eq!(parse_authorization(&format!("Basic {no_colon}")), None);
    }

    #[test]
    fn token_digest_is_hex_sha256() {
        assert_eq!(
            token_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
