use config::{ConfigError, Value};
use serde::Deserialize;
use std::env;

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub cache: CacheConfig,
    pub media: MediaConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

// Настройки базы данных
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Настройки Redis
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

// TTL кешей в секундах
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub session_ttl_seconds: u64,
    pub search_ttl_seconds: u64,
    pub auth_ttl_seconds: u64,
}

// Загрузка изображений
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: String,
    pub max_upload_bytes: usize,
}

// (ключ в конфиге, переменная окружения)
const ENV_KEYS: &[(&str, &str)] = &[
    ("app.host", "HOST"),
    ("app.port", "PORT"),
    ("app.environment", "ENVIRONMENT"),
    ("app.rust_log", "RUST_LOG"),
    ("database.url", "DATABASE_URL"),
    ("database.pool_size", "DB_POOL_SIZE"),
    ("redis.url", "REDIS_URL"),
    ("cache.session_ttl_seconds", "SESSION_CACHE_TTL_SECONDS"),
    ("cache.search_ttl_seconds", "SEARCH_CACHE_TTL_SECONDS"),
    ("cache.auth_ttl_seconds", "AUTH_CACHE_TTL_SECONDS"),
    ("media.root", "MEDIA_ROOT"),
    ("media.max_upload_bytes", "MAX_UPLOAD_BYTES"),
];

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(|name| env::var(name).ok())
    }

    /// Значения по умолчанию, поверх них переменные из `lookup`.
    /// DATABASE_URL и REDIS_URL обязательны.
    pub fn load<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = config::Config::builder()
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8000)?
            .set_default("app.environment", "development")?
            .set_default("app.rust_log", "planetarium_api=debug,tower_http=debug")?
            .set_default("database.pool_size", 20)?
            .set_default("cache.session_ttl_seconds", 300)?
            .set_default("cache.search_ttl_seconds", 60)?
            .set_default("cache.auth_ttl_seconds", 900)?
            .set_default("media.root", "media")?
            .set_default("media.max_upload_bytes", 5 * 1024 * 1024)?;

        for (key, var) in ENV_KEYS {
            builder = builder.set_override_option(*key, lookup(*var).map(Value::from))?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.app.host, self.app.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::load(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_fill_optional_settings() {
        let cfg = load_from(&[
            ("DATABASE_URL", "postgres://localhost/planetarium"),
            ("REDIS_URL", "redis://localhost:6379"),
        ])
        .unwrap();

        assert_eq!(cfg.app.port, 8000);
        assert_eq!(cfg.database.pool_size, 20);
        assert_eq!(cfg.cache.session_ttl_seconds, 300);
        assert_eq!(cfg.media.root, "media");
        assert!(!cfg.app.is_production());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8000");
    }

    #[test]
    fn environment_overrides_defaults() {
        let cfg = load_from(&[
            ("DATABASE_URL", "postgres://db/planetarium"),
            ("REDIS_URL", "redis://cache"),
            ("PORT", "9090"),
            ("ENVIRONMENT", "production"),
            ("DB_POOL_SIZE", "5"),
        ])
        .unwrap();

        assert_eq!(cfg.app.port, 9090);
        assert_eq!(cfg.database.pool_size, 5);
        assert!(cfg.app.is_production());
    }

    #[test]
    fn database_url_is_required() {
        assert!(load_from(&[("REDIS_URL", "redis://cache")]).is_err());
    }

    #[test]
    fn invalid_port_is_an_error() {
        let res = load_from(&[
            ("DATABASE_URL", "postgres://db"),
            ("REDIS_URL", "redis://cache"),
            ("PORT", "not-a-port"),
        ]);
        assert!(res.is_err());
    }
}
