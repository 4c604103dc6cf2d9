use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_SENTIMENT_URL: &str =
    "https://api-inference.huggingface.co/models/cardiffnlp/twitter-roberta-base-sentiment";

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    pub seed_database: bool,
    pub auth: AuthConfig,
    pub sentiment: SentimentConfig,
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Put product and review mutations behind the auth gate.
    pub require_auth: bool,
}

#[derive(Clone, Debug)]
pub struct SentimentConfig {
    pub api_url: String,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable {0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Config {
    /// Reads `.env` (if present) and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            port: try_load("PORT", "5000")?,
            database_url: try_load("DATABASE_URL", "sqlite://product-reviews.db?mode=rwc")?,
            db_max_connections: try_load("DB_MAX_CONNECTIONS", "5")?,
            seed_database: load_flag("SEED_DATABASE", true)?,
            auth: AuthConfig {
                jwt_secret: required("JWT_SECRET")?,
                token_ttl_hours: try_load("TOKEN_TTL_HOURS", "24")?,
                require_auth: load_flag("REQUIRE_AUTH", false)?,
            },
            sentiment: SentimentConfig {
                api_url: try_load("SENTIMENT_API_URL", DEFAULT_SENTIMENT_URL)?,
                api_token: var("HF_API_TOKEN").filter(|token| !token.trim().is_empty()),
                timeout: Duration::from_secs(try_load("SENTIMENT_TIMEOUT_SECS", "10")?),
            },
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    var(key)
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    value.parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            value,
            reason: e.to_string(),
        }
    })
}

fn load_flag(key: &'static str, default: bool) -> Result<bool, ConfigError> {
    match var(key) {
        Some(value) => parse_flag(&value).ok_or(ConfigError::Invalid {
            key,
            value,
            reason: "expected true/false".into(),
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
