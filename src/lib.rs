pub mod booking;
pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod redis_client;
pub mod services;
pub mod store;
pub mod views;

use std::sync::Arc;
use tracing::info;

use booking::{AvailabilityIndex, ReservationEngine};
use store::PgBookingStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub redis: redis_client::RedisClient,
    pub cache: cache::CacheService,
    pub config: config::Config,
    pub booking: ReservationEngine<PgBookingStore>,
    pub catalog: services::CatalogService,
    pub sessions: services::SessionService,
    pub reservations: services::ReservationService,
    pub deletion: services::DeletionService,
    pub media: services::MediaStorage,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::connect(&config.database.url, config.database.pool_size).await?;
        info!("Database connected");

        db.run_migrations().await?;

        let redis = redis_client::RedisClient::connect(&config.redis.url).await?;
        info!("Redis connected");

        let cache = cache::CacheService::new(redis.clone(), config.cache.clone());
        let store = db.booking_store();
        let pool = db.pool.clone();

        Ok(Arc::new(Self {
            booking: ReservationEngine::new(store.clone()),
            catalog: services::CatalogService::new(pool.clone()),
            sessions: services::SessionService::new(pool.clone(), AvailabilityIndex::new(store)),
            reservations: services::ReservationService::new(pool.clone()),
            deletion: services::DeletionService::new(pool),
            media: services::MediaStorage::new(&config.media.root),
            db,
            redis,
            cache,
            config,
        }))
    }
}
