use crate::cache::CacheService;
use crate::catalog::{ActorView, TheatreHallView};
use crate::models::Genre;
use crate::storage::StoreError;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{info, warn};

pub const GENRES_KEY: &str = "catalog:genres";
pub const ACTORS_KEY: &str = "catalog:actors";
pub const THEATRE_HALLS_KEY: &str = "catalog:theatre_halls";

impl CacheService {
    pub async fn genres(&self) -> Result<Vec<Genre>, StoreError> {
        self.cached_list(GENRES_KEY, || self.catalog.list_genres()).await
    }

    pub async fn actors(&self) -> Result<Vec<ActorView>, StoreError> {
        self.cached_list(ACTORS_KEY, || self.catalog.list_actors()).await
    }

    pub async fn theatre_halls(&self) -> Result<Vec<TheatreHallView>, StoreError> {
        self.cached_list(THEATRE_HALLS_KEY, || self.catalog.list_theatre_halls()).await
    }

    // Инвалидировать закешированный список после создания записи
    pub async fn invalidate(&self, key: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), _> = conn.del(key).await;
        match result {
            Ok(()) => info!("Invalidated cache {}", key),
            Err(e) => warn!("Failed to invalidate cache {}: {}", key, e),
        }
    }

    // Сначала кеш, потом БД. Redis не обязателен: при его ошибках отдаём данные из БД
    async fn cached_list<T, F, Fut>(&self, key: &str, load: F) -> Result<Vec<T>, StoreError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>, StoreError>>,
    {
        if let Ok(items) = self.get_list_from_cache(key).await {
            return Ok(items);
        }

        let items = load().await?;
        if let Err(e) = self.save_list_to_cache(key, &items).await {
            warn!("Failed to cache {}: {}", key, e);
        }
        Ok(items)
    }

    // === Работа с кешем ===

    async fn get_list_from_cache<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: String = conn.get(key).await?;
        let items: Vec<T> = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(items)
    }

    async fn save_list_to_cache<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(items).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(key, data, self.ttl_seconds).await
    }
}
