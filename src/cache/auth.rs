use crate::cache::CacheService;
use redis::AsyncCommands;
use sha2::{Digest, Sha256};
use tracing::warn;

// В ключ попадает хеш от email:password, сам пароль в Redis не хранится
fn auth_key(email: &str, password: &str) -> String {
    let digest = Sha256::digest(format!("{}:{}", email, password).as_bytes());
    format!("auth:{}:{:x}", email, digest)
}

impl CacheService {
    /// Сохранить данные авторизованного пользователя в кеш
    pub async fn cache_auth_user(&self, email: &str, password: &str, user_json: &str) {
        let mut conn = self.redis.conn.clone();
        let res: Result<(), _> = conn
            .set_ex(auth_key(email, password), user_json, self.ttl.auth_ttl_seconds)
            .await;
        if let Err(e) = res {
            warn!("Failed to cache auth for {}: {:?}", email, e);
        }
    }

    /// Получить данные пользователя из кеша авторизации
    pub async fn get_cached_auth_user(&self, email: &str, password: &str) -> Option<String> {
        let mut conn = self.redis.conn.clone();
        conn.get::<_, Option<String>>(auth_key(email, password))
            .await
            .unwrap_or(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_key_hides_password() {
        let key = auth_key("astro@example.com", "secret");
        assert!(key.starts_with("auth:astro@example.com:"));
        assert!(!key.contains("secret"));
        assert_eq!(key.len(), "auth:astro@example.com:".len() + 64);
    }

    #[test]
    fn auth_key_depends_on_password() {
        assert_ne!(auth_key("a@b.c", "one"), auth_key("a@b.c", "two"));
    }
}
