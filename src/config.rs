use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use uuid::Uuid;

pub const DEFAULT_API_URL: &str = "http://localhost:5133/api";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub api_url: String,
    pub storage_path: String,
    pub request_timeout_secs: u64,
    pub cache_dedupe_ms: u64,
    pub session_tick_ms: u64,
    pub session_idle_secs: i64,
    pub default_quiz_id: Option<Uuid>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let default_quiz_id = match env::var("DEFAULT_QUIZ_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|e| {
                Error::Config(format!("Invalid value for DEFAULT_QUIZ_ID: {}", e))
            })?),
            _ => None,
        };

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            api_url: get_env_or("API_URL", DEFAULT_API_URL)
                .trim_end_matches('/')
                .to_string(),
            storage_path: get_env_or("STORAGE_PATH", "data/storage.json"),
            request_timeout_secs: get_env_parse_or("REQUEST_TIMEOUT_SECS", 30)?,
            cache_dedupe_ms: get_env_parse_or("CACHE_DEDUPE_MS", 2000)?,
            session_tick_ms: get_env_parse_or("SESSION_TICK_MS", 1000)?,
            session_idle_secs: get_env_parse_or("SESSION_IDLE_SECS", 3600)?,
            default_quiz_id,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
