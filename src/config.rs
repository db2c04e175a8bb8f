use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub locality_api_url: String,
    /// Credential for the internal batch-refresh endpoint.
    pub service_token: String,
    pub provider_timeout_ms: u64,
    pub price_cache_ttl_secs: u64,
    pub trigger_max_concurrency: usize,
    pub batch_concurrency: usize,
    pub batch_pause_ms: u64,
    pub skip_recent_days: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or_default(&env_map, "PORT", 8080u16)?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let locality_api_url = env_map
            .get("LOCALITY_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("LOCALITY_API_URL".to_string()))?;

        let service_token = env_map
            .get("SERVICE_TOKEN")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("SERVICE_TOKEN".to_string()))?;
        if service_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "SERVICE_TOKEN".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let provider_timeout_ms = parse_or_default(&env_map, "PROVIDER_TIMEOUT_MS", 5000u64)?;
        let price_cache_ttl_secs = parse_or_default(&env_map, "PRICE_CACHE_TTL_SECS", 86400u64)?;
        let trigger_max_concurrency =
            parse_or_default(&env_map, "TRIGGER_MAX_CONCURRENCY", 8usize)?;
        let batch_concurrency = parse_or_default(&env_map, "BATCH_CONCURRENCY", 3usize)?;
        let batch_pause_ms = parse_or_default(&env_map, "BATCH_PAUSE_MS", 250u64)?;
        let skip_recent_days = parse_or_default(&env_map, "SKIP_RECENT_DAYS", 90i64)?;

        Ok(Config {
            port,
            database_path,
            locality_api_url,
            service_token,
            provider_timeout_ms,
            price_cache_ttl_secs,
            trigger_max_concurrency,
            batch_concurrency,
            batch_pause_ms,
            skip_recent_days,
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(
                key.to_string(),
                format!("could not parse {:?}", raw),
            )
        }),
    }
}
