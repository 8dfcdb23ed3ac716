//! Configuration module for the feed service.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the API (authentication disabled when unset)
    pub api_psk: Option<String>,
    /// Path to the SQLite file backing the document store
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Organic posts between two promoted items in the feed
    pub ad_interval: usize,
    /// Maximum number of posts loaded for the feed
    pub page_limit: usize,
    /// Delay before a search query is executed
    pub search_debounce: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_psk: None,
            db_path: PathBuf::from("./data/feed.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            ad_interval: 5,
            page_limit: 50,
            search_debounce: Duration::from_millis(300),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let api_psk = env::var("FEED_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("FEED_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let bind_addr = match env::var("FEED_BIND_ADDR") {
            Ok(raw) => raw.parse().map_err(|_| {
                AppError::Validation(format!("Invalid FEED_BIND_ADDR format: {}", raw))
            })?,
            Err(_) => defaults.bind_addr,
        };

        let log_level = env::var("FEED_LOG_LEVEL").unwrap_or(defaults.log_level);

        let ad_interval = parse_usize("FEED_AD_INTERVAL", defaults.ad_interval)?;
        if ad_interval == 0 {
            return Err(AppError::Validation(
                "FEED_AD_INTERVAL must be at least 1".to_string(),
            ));
        }

        let page_limit = parse_usize("FEED_PAGE_LIMIT", defaults.page_limit)?;

        let search_debounce = Duration::from_millis(parse_usize(
            "FEED_SEARCH_DEBOUNCE_MS",
            defaults.search_debounce.as_millis() as usize,
        )? as u64);

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            ad_interval,
            page_limit,
            search_debounce,
        })
    }
}

fn parse_usize(var: &str, default: usize) -> Result<usize, AppError> {
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("Invalid {} value: {}", var, raw))),
        Err(_) => Ok(default),
    }
}
