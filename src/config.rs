use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
    pub cors_origins: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    /// Prefix for every Redis store key.
    pub namespace: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Memory,
    Disabled,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    pub url: Option<String>,
    pub ttl_secs: u64,
    pub connect_timeout_ms: u64,
    pub max_retries: u32,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            api_prefix: "/api/v1".into(),
            cors_origins: vec!["http://localhost:5173".into()],
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

impl Config {
    /// Layers built-in defaults, `config/default`, an optional `config/local`
    /// and `APP_`-prefixed environment variables (`APP_AUTH__JWT_SECRET`).
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.api_prefix", "/api/v1")?
            .set_default("server.cors_origins", vec!["http://localhost:5173"])?
            .set_default("server.max_body_bytes", 1024 * 1024)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("auth.bcrypt_cost", 10)?
            .set_default("store.backend", "memory")?
            .set_default("cache.backend", "disabled")?
            .set_default("cache.ttl_secs", 300)?
            .set_default("cache.connect_timeout_ms", 10_000)?
            .set_default("cache.max_retries", 10)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        config.try_deserialize()
    }
}
