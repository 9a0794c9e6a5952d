use crate::cache::CacheService;
use redis::AsyncCommands;
use tracing::{debug, warn};

pub const SESSION_KEY_PATTERN: &str = "show_session:*";

fn session_key(session_id: i64) -> String {
    format!("show_session:{}:detail", session_id)
}

impl CacheService {
    // Готовый JSON карточки сеанса
    pub async fn get_session_detail(&self, session_id: i64) -> Option<String> {
        let mut conn = self.redis.conn.clone();
        match conn.get::<_, Option<String>>(session_key(session_id)).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Session cache read failed for {}: {:?}", session_id, e);
                None
            }
        }
    }

    pub async fn cache_session_detail(&self, session_id: i64, json: &str) {
        let mut conn = self.redis.conn.clone();
        let res: Result<(), _> = conn
            .set_ex(session_key(session_id), json, self.ttl.session_ttl_seconds)
            .await;
        if let Err(e) = res {
            warn!("Session cache write failed for {}: {:?}", session_id, e);
        }
    }

    // Вызывается после брони, удаления брони и изменения сеанса
    pub async fn invalidate_sessions(&self, session_ids: &[i64]) {
        if session_ids.is_empty() {
            return;
        }
        let keys: Vec<String> = session_ids.iter().map(|id| session_key(*id)).collect();
        let mut conn = self.redis.conn.clone();
        let res: Result<(), _> = conn.del(keys).await;
        match res {
            Ok(()) => debug!("Invalidated session cache for {:?}", session_ids),
            Err(e) => warn!("Session cache invalidation failed for {:?}: {:?}", session_ids, e),
        }
    }

    pub async fn invalidate_all_sessions(&self) {
        if let Err(e) = self.redis.delete_matching(SESSION_KEY_PATTERN).await {
            warn!("Failed to drop session cache: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_matches_invalidation_pattern() {
        let key = session_key(17);
        assert_eq!(key, "show_session:17:detail");
        assert!(key.starts_with(SESSION_KEY_PATTERN.trim_end_matches('*')));
    }
}
