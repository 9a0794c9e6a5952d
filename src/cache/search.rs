use crate::cache::CacheService;
use redis::AsyncCommands;
use serde::Serialize;
use tracing::warn;

pub const SEARCH_KEY_PATTERN: &str = "search:*";
pub const SHOW_SEARCH_SCOPE: &str = "shows";

/// Ключ кеша для поиска: пространство + параметры запроса в urlencoded виде.
pub fn search_key<Q: Serialize>(scope: &str, query: &Q) -> String {
    let params = serde_urlencoded::to_string(query).unwrap_or_default();
    format!("search:{}:{}", scope, params)
}

impl CacheService {
    /// Получает закешированный результат поиска по ключу.
    pub async fn get_cached_search(&self, key: &str) -> Option<String> {
        let mut conn = self.redis.conn.clone();
        conn.get::<_, Option<String>>(key).await.unwrap_or_else(|e| {
            warn!("Search cache read failed for {}: {:?}", key, e);
            None
        })
    }

    /// Сохраняет результат поиска с TTL из конфигурации.
    pub async fn cache_search_result(&self, key: &str, value: &str) {
        let mut conn = self.redis.conn.clone();
        let res: Result<(), _> = conn.set_ex(key, value, self.ttl.search_ttl_seconds).await;
        if let Err(e) = res {
            warn!("Failed to cache search result {}: {:?}", key, e);
        }
    }

    // После изменений каталога старые выдачи больше не верны
    pub async fn invalidate_search(&self, scope: &str) {
        let pattern = format!("search:{}:*", scope);
        if let Err(e) = self.redis.delete_matching(&pattern).await {
            warn!("Failed to invalidate search cache {}: {:?}", pattern, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Filters<'a> {
        title: Option<&'a str>,
        show_themes: Option<&'a str>,
    }

    #[test]
    fn key_encodes_present_filters_only() {
        let key = search_key(SHOW_SEARCH_SCOPE, &Filters { title: Some("big bang"), show_themes: None });
        assert_eq!(key, "search:shows:title=big+bang");
    }

    #[test]
    fn different_filters_give_different_keys() {
        let a = search_key(SHOW_SEARCH_SCOPE, &Filters { title: None, show_themes: Some("1,2") });
        let b = search_key(SHOW_SEARCH_SCOPE, &Filters { title: None, show_themes: Some("2") });
        assert_ne!(a, b);
    }
}
