//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::social::reddit::DEFAULT_API_URL;
use crate::util::rate_limit::REQUEST_BURST_PER_SEC;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,
    /// HMAC secret for identity tokens
    pub identity_secret: String,

    /// Redis REST endpoint; in-process store when absent
    pub store_url: Option<String>,
    pub store_token: Option<String>,

    /// Social API bearer token; logging poster when absent
    pub social_access_token: Option<String>,
    pub subreddit: Option<String>,
    pub social_api_url: String,

    /// Per-identity request burst allowed each second
    pub request_burst_per_sec: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Hosts that inject PORT win over SERVER_ADDR
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let request_burst_per_sec = match optional("REQUEST_BURST_PER_SEC") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::Invalid("REQUEST_BURST_PER_SEC"))?,
            None => REQUEST_BURST_PER_SEC,
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("CLIENT_ORIGIN")
                .map_err(|_| ConfigError::Missing("CLIENT_ORIGIN"))?,
            identity_secret: env::var("IDENTITY_SECRET")
                .map_err(|_| ConfigError::Missing("IDENTITY_SECRET"))?,

            store_url: optional("STORE_URL"),
            store_token: optional("STORE_TOKEN"),

            social_access_token: optional("SOCIAL_ACCESS_TOKEN"),
            subreddit: optional("SUBREDDIT"),
            social_api_url: optional("SOCIAL_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),

            request_burst_per_sec,
        })
    }

    /// Local defaults with in-process backends
    pub fn local(identity_secret: impl Into<String>) -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            client_origin: "http://localhost:5173".to_string(),
            identity_secret: identity_secret.into(),
            store_url: None,
            store_token: None,
            social_access_token: None,
            subreddit: None,
            social_api_url: DEFAULT_API_URL.to_string(),
            request_burst_per_sec: REQUEST_BURST_PER_SEC,
        }
    }
}

/// Unset and blank variables both count as absent
fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
