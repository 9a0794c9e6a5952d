use crate::{config::CacheConfig, redis_client::RedisClient};
use tracing::{info, warn};

pub mod auth;
pub mod search;
pub mod sessions;

// Кеш только для чтения: любой сбой Redis логируется, данные берутся из БД.
// Бронирование никогда не читает из кеша.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    ttl: CacheConfig,
}

impl CacheService {
    pub fn new(redis: RedisClient, ttl: CacheConfig) -> Self {
        Self { redis, ttl }
    }

    // Сброс всего кеша каталога при старте: схема могла поменяться
    pub async fn reset_catalog_cache(&self) {
        let mut cleared = 0;
        for pattern in [sessions::SESSION_KEY_PATTERN, search::SEARCH_KEY_PATTERN] {
            match self.redis.delete_matching(pattern).await {
                Ok(n) => cleared += n,
                Err(e) => warn!("Failed to clear cache keys {}: {:?}", pattern, e),
            }
        }
        info!("Catalog cache reset, {} keys removed", cleared);
    }
}

/// Что изменилось в каталоге. Определяет, какие закешированные ответы устарели.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogChange {
    Theme,
    Show,
    Dome,
}

impl CatalogChange {
    pub fn search_scopes(self) -> &'static [&'static str] {
        match self {
            // Имена тем входят в выдачу списка программ
            CatalogChange::Theme | CatalogChange::Show => &[search::SHOW_SEARCH_SCOPE],
            CatalogChange::Dome => &[],
        }
    }

    // Карточка сеанса встраивает программу с темами и купол
    pub fn stales_session_details(self) -> bool {
        match self {
            CatalogChange::Theme | CatalogChange::Show | CatalogChange::Dome => true,
        }
    }
}

impl CacheService {
    pub async fn invalidate_catalog(&self, change: CatalogChange) {
        for scope in change.search_scopes() {
            self.invalidate_search(scope).await;
        }
        if change.stales_session_details() {
            self.invalidate_all_sessions().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_change_drops_show_search_and_session_details() {
        assert_eq!(CatalogChange::Theme.search_scopes(), &[search::SHOW_SEARCH_SCOPE]);
        assert!(CatalogChange::Theme.stales_session_details());
    }

    #[test]
    fn dome_change_keeps_show_search() {
        assert!(CatalogChange::Dome.search_scopes().is_empty());
        assert!(CatalogChange::Dome.stales_session_details());
        assert!(CatalogChange::Show.stales_session_details());
    }
}
