use crate::cache::CacheService;
use crate::middleware::AuthUser;
use chrono::Utc;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Сколько секунд запись кеша авторизации считается свежей. Старше этого
/// пользователь перечитывается из БД: снятие is_staff или is_active видно быстро.
pub const AUTH_RECHECK_SECONDS: i64 = 60;

#[derive(Debug, Serialize, Deserialize)]
struct CachedAuthUser {
    user: AuthUser,
    cached_at: i64,
}

fn token_key(digest: &str) -> String {
    format!("auth:token:{}", digest)
}

fn is_fresh(cached_at: i64, now: i64) -> bool {
    (0..AUTH_RECHECK_SECONDS).contains(&(now - cached_at))
}

impl CacheService {
    /// Сохранить пользователя, найденного по дайджесту токена
    pub async fn cache_auth_user(
        &self,
        digest: &str,
        user: &AuthUser,
        ttl_seconds: u64,
    ) -> Result<(), redis::RedisError> {
        let entry = CachedAuthUser {
            user: user.clone(),
            cached_at: Utc::now().timestamp(),
        };
        let data = serde_json::to_string(&entry).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(token_key(digest), data, ttl_seconds).await
    }

    /// Получить пользователя из кеша авторизации. Промах, устаревшая запись
    /// и ошибки Redis дают `None`.
    pub async fn get_cached_auth_user(&self, digest: &str) -> Option<AuthUser> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = match conn.get(token_key(digest)).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Auth cache unavailable: {}", e);
                return None;
            }
        };
        let entry: CachedAuthUser = serde_json::from_str(&data?).ok()?;
        is_fresh(entry.cached_at, Utc::now().timestamp()).then_some(entry.user)
    }

    /// Убрать токен из кеша (пользователь больше не активен)
    pub async fn forget_auth_user(&self, digest: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn.del(token_key(digest)).await;
        if let Err(e) = result {
            warn!("Failed to drop cached token: {}", e);
        }
    }
}
