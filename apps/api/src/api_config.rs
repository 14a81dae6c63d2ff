use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use tessera_application::DEFAULT_DECISION_CACHE_TTL_SECONDS;
use tessera_core::AppError;
use tracing_subscriber::EnvFilter;

const MIN_INTERNAL_SHARED_SECRET_LEN: usize = 32;
const DEFAULT_REDIS_KEY_PREFIX: &str = "tessera:decision";

/// Backing store for the authorization data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Postgres { database_url: String },
    InMemory,
}

/// Where resolved decisions are cached, if anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionCacheConfig {
    Disabled,
    InMemory,
    Redis { redis_url: String, key_prefix: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreBackend {
    Postgres,
    InMemory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::InMemory),
            other => Err(AppError::Validation(format!(
                "STORE_BACKEND must be either 'postgres' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecisionCacheBackend {
    Disabled,
    InMemory,
    Redis,
}

impl FromStr for DecisionCacheBackend {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "none" => Ok(Self::Disabled),
            "memory" => Ok(Self::InMemory),
            "redis" => Ok(Self::Redis),
            other => Err(AppError::Validation(format!(
                "DECISION_CACHE_BACKEND must be one of 'none', 'memory' or 'redis', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub store: StoreConfig,
    pub api_host: String,
    pub api_port: u16,
    pub internal_shared_secret: String,
    pub decision_cache: DecisionCacheConfig,
    pub decision_cache_ttl_seconds: u32,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let store = match optional_env("STORE_BACKEND")
            .as_deref()
            .unwrap_or("postgres")
            .parse::<StoreBackend>()?
        {
            StoreBackend::Postgres => StoreConfig::Postgres {
                database_url: required_non_empty_env("DATABASE_URL")?,
            },
            StoreBackend::InMemory => StoreConfig::InMemory,
        };

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3101);

        let internal_shared_secret =
            validate_internal_shared_secret(required_env("INTERNAL_SHARED_SECRET")?)?;

        let decision_cache = match optional_env("DECISION_CACHE_BACKEND")
            .as_deref()
            .unwrap_or("none")
            .parse::<DecisionCacheBackend>()?
        {
            DecisionCacheBackend::Disabled => DecisionCacheConfig::Disabled,
            DecisionCacheBackend::InMemory => DecisionCacheConfig::InMemory,
            DecisionCacheBackend::Redis => DecisionCacheConfig::Redis {
                redis_url: required_non_empty_env("REDIS_URL").map_err(|_| {
                    AppError::Validation(
                        "REDIS_URL is required when DECISION_CACHE_BACKEND=redis".to_owned(),
                    )
                })?,
                key_prefix: optional_env("REDIS_KEY_PREFIX")
                    .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            },
        };

        let decision_cache_ttl_seconds =
            parse_ttl_seconds(optional_env("DECISION_CACHE_TTL_SECONDS").as_deref())?;

        Ok(Self {
            migrate_only,
            store,
            api_host,
            api_port,
            internal_shared_secret,
            decision_cache,
            decision_cache_ttl_seconds,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }

    pub fn requires_redis(&self) -> bool {
        matches!(self.decision_cache, DecisionCacheConfig::Redis { .. })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn validate_internal_shared_secret(secret: String) -> Result<String, AppError> {
    if secret.len() < MIN_INTERNAL_SHARED_SECRET_LEN {
        return Err(AppError::Validation(format!(
            "INTERNAL_SHARED_SECRET must be at least {MIN_INTERNAL_SHARED_SECRET_LEN} characters"
        )));
    }

    Ok(secret)
}

fn parse_ttl_seconds(value: Option<&str>) -> Result<u32, AppError> {
    match value {
        None => Ok(DEFAULT_DECISION_CACHE_TTL_SECONDS),
        Some(value) => value.trim().parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid DECISION_CACHE_TTL_SECONDS: {error}"))
        }),
    }
}

fn optional_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::{
        DecisionCacheBackend, StoreBackend, parse_ttl_seconds, validate_internal_shared_secret,
    };

    #[test]
    fn store_backend_accepts_known_values_only() {
        assert_eq!("postgres".parse::<StoreBackend>().ok(), Some(StoreBackend::Postgres));
        assert_eq!(" memory ".parse::<StoreBackend>().ok(), Some(StoreBackend::InMemory));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn decision_cache_backend_accepts_known_values_only() {
        assert_eq!(
            "none".parse::<DecisionCacheBackend>().ok(),
            Some(DecisionCacheBackend::Disabled)
        );
        assert_eq!(
            "redis".parse::<DecisionCacheBackend>().ok(),
            Some(DecisionCacheBackend::Redis)
        );
        assert!("memcached".parse::<DecisionCacheBackend>().is_err());
    }

    #[test]
    fn ttl_defaults_to_five_seconds_and_allows_zero() {
        assert_eq!(parse_ttl_seconds(None).ok(), Some(5));
        assert_eq!(parse_ttl_seconds(Some("0")).ok(), Some(0));
        assert!(parse_ttl_seconds(Some("-1")).is_err());
    }

    #[test]
    fn short_internal_secrets_are_rejected() {
        assert!(validate_internal_shared_secret("too-short".to_owned()).is_err());
        assert!(validate_internal_shared_secret("x".repeat(32)).is_ok());
    }
}
