use crate::{catalog::CatalogClient, redis_client::RedisClient};
use tracing::info;

pub mod auth;
pub mod catalog;

#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    catalog: CatalogClient,
    ttl_seconds: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, catalog: CatalogClient, ttl_seconds: u64) -> Self {
        Self { redis, catalog, ttl_seconds }
    }

    // Прогрев кеша при старте
    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        if let Ok(genres) = self.genres().await {
            info!("Loaded {} genres", genres.len());
        }
        if let Ok(actors) = self.actors().await {
            info!("Loaded {} actors", actors.len());
        }
        if let Ok(halls) = self.theatre_halls().await {
            info!("Loaded {} theatre halls", halls.len());
        }

        info!("Cache warmup done");
    }
}
