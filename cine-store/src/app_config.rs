use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub business_rules: BusinessRules,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BusinessRules {
    /// Advisory seat-lock TTL. One canonical value for every call site.
    #[serde(default = "default_seat_lock_seconds")]
    pub seat_lock_seconds: u64,
    /// Seat metadata is immutable; a day of cache is conservative.
    #[serde(default = "default_cache_seconds")]
    pub seat_cache_seconds: u64,
    #[serde(default = "default_cache_seconds")]
    pub showing_cache_seconds: u64,
}

fn default_seat_lock_seconds() -> u64 {
    60
}

fn default_cache_seconds() -> u64 {
    86_400
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `CINE__SERVER__PORT=8080`
            .add_source(config::Environment::with_prefix("CINE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
