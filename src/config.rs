use anyhow::{Context, Result};
use std::{env, net::SocketAddr, time::Duration};
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Process-wide settings, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub addr: SocketAddr,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so it can be tested
    /// without touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = match get("TMDB_API_KEY") {
            Some(key) => key,
            None => {
                warn!("TMDB_API_KEY not set - upstream requests will be rejected");
                String::new()
            }
        };

        let base_url = get("TMDB_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let addr_raw = get("MOVIEFLIX_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_raw
            .parse()
            .with_context(|| format!("Invalid MOVIEFLIX_ADDR '{}'", addr_raw))?;

        let timeout_secs = match get("TMDB_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("Invalid TMDB_TIMEOUT_SECS '{}'", raw))?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        Ok(Self {
            api_key,
            base_url,
            addr,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
