use serde::Serialize;
use sqlx::FromRow;
use chrono::{DateTime, Utc};

use crate::database::Database;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    // Найти пользователя по email
    pub async fn find_by_email(email: &str, db: &Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, is_staff, is_active, created_at
             FROM users WHERE email = $1"
        )
        .bind(email)
        .fetch_optional(&db.pool)
        .await
    }

    // Найти активного пользователя по sha256-дайджесту токена
    pub async fn find_by_token_digest(digest: &str, db: &Database) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.email, u.password_hash, u.is_staff, u.is_active, u.created_at
             FROM auth_tokens t
             JOIN users u ON u.id = t.user_id
             WHERE t.digest = $1 AND u.is_active = true"
        )
        .bind(digest)
        .fetch_optional(&db.pool)
        .await
    }

    pub async fn create(email: &str, password_hash: &str, db: &Database) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (email, password_hash)
             VALUES ($1, $2)
             RETURNING id, email, password_hash, is_staff, is_active, created_at"
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&db.pool)
        .await
    }

    /// Сохраняет дайджест выданного токена. Сам токен в БД не хранится.
    pub async fn store_token_digest(&self, digest: &str, db: &Database) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO auth_tokens (digest, user_id) VALUES ($1, $2)")
            .bind(digest)
            .bind(self.id)
            .execute(&db.pool)
            .await?;
        Ok(())
    }

    // Проверить пароль по bcrypt-хешу
    pub fn verify_password(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.password_hash).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_password(password: &str) -> User {
        User {
            id: 1,
            email: "test@gmail.com".into(),
            // минимальная стоимость, чтобы тест не тормозил
            password_hash: bcrypt::hash(password, 4).unwrap(),
            is_staff: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn verify_password_accepts_matching_password() {
        let user = user_with_password("testpassword123");
        assert!(user.verify_password("testpassword123"));
        assert!(!user.verify_password("wrong"));
    }

    #[test]
    fn verify_password_rejects_garbage_hash() {
        let mut user = user_with_password("x");
        user.password_hash = "not-a-bcrypt-hash".into();
        assert!(!user.verify_password("x"));
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let json = serde_json::to_value(user_with_password("secret")).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["email"], "test@gmail.com");
    }
}
