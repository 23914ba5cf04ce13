use serde::Deserialize;
use std::env;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

// Главная структура конфигурации - контейнер для всех настроек
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub media: MediaConfig,
}

// Настройки приложения
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(()),
        }
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
    /// TTL закешированных списков каталога
    pub cache_ttl_seconds: u64,
    pub auth_cache_ttl_seconds: u64,
}

// Загрузка изображений спектаклей
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    pub root: String,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Config {
            app: AppConfig {
                host: var_or("HOST", "0.0.0.0".to_string())?,
                port: var_or("PORT", 8000)?,
                environment: var_or("ENVIRONMENT", "development".to_string())?,
                rust_log: var_or(
                    "RUST_LOG",
                    "theatre_booking=debug,tower_http=debug".to_string(),
                )?,
                log_format: var_or("LOG_FORMAT", LogFormat::Text)?,
            },
            database: DatabaseConfig {
                url: required("DATABASE_URL")?,
                pool_size: var_or("DB_POOL_SIZE", 20)?,
            },
            redis: RedisConfig {
                url: required("REDIS_URL")?,
                cache_ttl_seconds: var_or("CACHE_TTL_SECONDS", 3600)?,
                auth_cache_ttl_seconds: var_or("AUTH_CACHE_TTL_SECONDS", 900)?,
            },
            media: MediaConfig {
                root: var_or("MEDIA_ROOT", "./media".to_string())?,
                max_upload_bytes: var_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024)?,
            },
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn var_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => parse(name, &value),
        Err(_) => Ok(default),
    }
}

fn parse<T: FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_formats() {
        assert_eq!(parse::<u16>("PORT", " 8080 ").unwrap(), 8080);
        assert_eq!(parse::<LogFormat>("LOG_FORMAT", "JSON").unwrap(), LogFormat::Json);
    }

    #[test]
    fn invalid_value_names_the_variable() {
        let err = parse::<u32>("DB_POOL_SIZE", "many").unwrap_err();
        assert_eq!(err.to_string(), "DB_POOL_SIZE has invalid value \"many\"");
    }
}
