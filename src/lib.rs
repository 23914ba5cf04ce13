pub mod config;
pub mod database;
pub mod redis_client;
pub mod models;
pub mod booking;
pub mod storage;
pub mod catalog;
pub mod errors;
pub mod extract;
pub mod controllers;
pub mod middleware;
pub mod cache;

use std::sync::Arc;
use tokio::task;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub catalog: catalog::CatalogClient,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database.url, config.database.pool_size).await?;
        tracing::info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::new(&config.redis.url).await?;
        tracing::info!("Redis connected");

        let catalog = catalog::CatalogClient::new(db.pool.clone());
        let cache = cache::CacheService::new(
            redis.clone(),
            catalog.clone(),
            config.redis.cache_ttl_seconds,
        );
        let state = Arc::new(Self {
            db,
            redis,
            cache,
            catalog,
            config,
        });

        let state_for_bg = state.clone();
        task::spawn(async move {
            // Warmup cache в фоне
            state_for_bg.cache.warmup_cache().await;
        });

        Ok(state)
    }
}
