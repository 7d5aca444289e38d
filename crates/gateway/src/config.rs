//! Gateway configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid value for {key}: '{value}'")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

/// Base URLs of the services behind the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstreams {
    pub auth: String,
    pub profile: String,
    pub stall: String,
    pub reservation: String,
    pub notification: String,
}

impl Default for Upstreams {
    fn default() -> Self {
        Self {
            auth: "http://localhost:8080".to_string(),
            profile: "http://localhost:8081".to_string(),
            notification: "http://localhost:8082".to_string(),
            reservation: "http://localhost:8083".to_string(),
            stall: "http://localhost:8084".to_string(),
        }
    }
}

/// Reads `HOST`, `PORT`, `RUST_LOG`, `LOG_FORMAT`, `GATEWAY_TIMEOUT_SECS` and
/// the `*_SERVICE_URL` upstreams.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logs: bool,
    /// Upper bound on one upstream round trip.
    pub timeout: Duration,
    pub upstreams: Upstreams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_level: "info".to_string(),
            json_logs: false,
            timeout: Duration::from_secs(30),
            upstreams: Upstreams::default(),
        }
    }
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError { key, value }),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let url = |key: &str, default: String| {
            std::env::var(key)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(default)
        };

        Ok(Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parse_env("PORT", defaults.port)?,
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            json_logs: std::env::var("LOG_FORMAT").is_ok_and(|f| f == "json"),
            timeout: Duration::from_secs(parse_env("GATEWAY_TIMEOUT_SECS", 30)?),
            upstreams: Upstreams {
                auth: url("AUTH_SERVICE_URL", defaults.upstreams.auth),
                profile: url("PROFILE_SERVICE_URL", defaults.upstreams.profile),
                stall: url("STALL_SERVICE_URL", defaults.upstreams.stall),
                reservation: url("RESERVATION_SERVICE_URL", defaults.upstreams.reservation),
                notification: url("NOTIFICATION_SERVICE_URL", defaults.upstreams.notification),
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
