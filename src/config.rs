use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::AppError;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_FEED_INTERVAL_SECS: u64 = 30;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4000";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api_base_url: String,
    pub feed_interval: Duration,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("COURSES_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        if api_base_url.is_empty() {
            return Err(AppError::Config("COURSES_API_URL is empty".to_string()));
        }

        let interval_secs = match lookup("FEED_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                AppError::Config(format!("FEED_INTERVAL_SECS is not a number: {}", raw))
            })?,
            None => DEFAULT_FEED_INTERVAL_SECS,
        };
        if interval_secs == 0 {
            return Err(AppError::Config("FEED_INTERVAL_SECS must be positive".to_string()));
        }

        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|_| AppError::Config(format!("BIND_ADDR is not a socket address: {}", bind_raw)))?;

        Ok(Self {
            api_base_url,
            feed_interval: Duration::from_secs(interval_secs),
            bind_addr,
        })
    }
}
