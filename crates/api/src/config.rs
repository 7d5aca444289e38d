//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use clients::SmtpConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown SERVICE '{0}', expected auth, profile, stall, reservation, notification or all")]
    UnknownService(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

/// Which service this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Auth,
    Profile,
    Stall,
    Reservation,
    Notification,
    /// Every service in one process, wired through local adapters.
    All,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Auth => "auth-service",
            ServiceKind::Profile => "profile-service",
            ServiceKind::Stall => "stall-service",
            ServiceKind::Reservation => "reservation-service",
            ServiceKind::Notification => "notification-service",
            ServiceKind::All => "bookfair",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ServiceKind::Auth => 8080,
            ServiceKind::Profile => 8081,
            ServiceKind::Notification => 8082,
            ServiceKind::Reservation => 8083,
            ServiceKind::Stall => 8084,
            ServiceKind::All => 8090,
        }
    }

    /// True when this process serves `other` itself.
    pub fn runs(&self, other: ServiceKind) -> bool {
        *self == ServiceKind::All || *self == other
    }
}

impl FromStr for ServiceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auth" => Ok(ServiceKind::Auth),
            "profile" => Ok(ServiceKind::Profile),
            "stall" => Ok(ServiceKind::Stall),
            "reservation" => Ok(ServiceKind::Reservation),
            "notification" => Ok(ServiceKind::Notification),
            "all" => Ok(ServiceKind::All),
            _ => Err(ConfigError::UnknownService(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Base URLs of the peer services, used when they run in other processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerUrls {
    pub auth: String,
    pub profile: String,
    pub stall: String,
    pub reservation: String,
    pub notification: String,
}

impl PeerUrls {
    fn from_env() -> Self {
        let url = |key: &str, kind: ServiceKind| {
            std::env::var(key)
                .unwrap_or_else(|_| format!("http://localhost:{}", kind.default_port()))
        };
        Self {
            auth: url("AUTH_SERVICE_URL", ServiceKind::Auth),
            profile: url("PROFILE_SERVICE_URL", ServiceKind::Profile),
            stall: url("STALL_SERVICE_URL", ServiceKind::Stall),
            reservation: url("RESERVATION_SERVICE_URL", ServiceKind::Reservation),
            notification: url("NOTIFICATION_SERVICE_URL", ServiceKind::Notification),
        }
    }
}

/// Server configuration.
///
/// Reads `SERVICE`, `HOST`, `PORT`, `RUST_LOG`, `LOG_FORMAT`, `DATABASE_URL`,
/// `DATABASE_MAX_CONNECTIONS`, `JWT_SECRET`, `JWT_EXPIRATION_MINUTES`,
/// `MAX_STALLS_PER_USER`, `QR_CODE_DIR`, the `*_SERVICE_URL` peers and the
/// `SMTP_*`/`MAIL_FROM*` mail settings.
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceKind,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    /// `None` keeps everything in memory.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub jwt_secret: Option<String>,
    pub jwt_expiration_minutes: i64,
    pub max_stalls_per_user: i64,
    pub qr_code_dir: PathBuf,
    pub peers: PeerUrls,
    /// `None` logs emails instead of sending them.
    pub smtp: Option<SmtpConfig>,
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        Err(_) => Ok(default),
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for Config {
    /// Everything in one process, in memory, with no mail server.
    fn default() -> Self {
        let url = |kind: ServiceKind| format!("http://localhost:{}", kind.default_port());
        Self {
            service: ServiceKind::All,
            host: "0.0.0.0".to_string(),
            port: ServiceKind::All.default_port(),
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            database_max_connections: 10,
            jwt_secret: None,
            jwt_expiration_minutes: 300,
            max_stalls_per_user: 3,
            qr_code_dir: PathBuf::from("./uploads/qrcodes"),
            peers: PeerUrls {
                auth: url(ServiceKind::Auth),
                profile: url(ServiceKind::Profile),
                stall: url(ServiceKind::Stall),
                reservation: url(ServiceKind::Reservation),
                notification: url(ServiceKind::Notification),
            },
            smtp: None,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let service = match std::env::var("SERVICE") {
            Ok(s) => s.parse()?,
            Err(_) => ServiceKind::All,
        };

        let log_format = match std::env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let smtp = match non_empty_env("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_env("SMTP_PORT", 1025)?,
                username: non_empty_env("SMTP_USERNAME"),
                password: non_empty_env("SMTP_PASSWORD"),
                from_address: std::env::var("MAIL_FROM")
                    .unwrap_or_else(|_| "noreply@bookfair.lk".to_string()),
                from_name: std::env::var("MAIL_FROM_NAME")
                    .unwrap_or_else(|_| "Colombo International Bookfair".to_string()),
            }),
            None => None,
        };

        Ok(Self {
            service,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", service.default_port())?,
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format,
            database_url: non_empty_env("DATABASE_URL"),
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: non_empty_env("JWT_SECRET"),
            jwt_expiration_minutes: parse_env("JWT_EXPIRATION_MINUTES", 300)?,
            max_stalls_per_user: parse_env("MAX_STALLS_PER_USER", 3)?,
            qr_code_dir: std::env::var("QR_CODE_DIR")
                .unwrap_or_else(|_| "./uploads/qrcodes".to_string())
                .into(),
            peers: PeerUrls::from_env(),
            smtp,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    const KEYS: &[&str] = &[
        "SERVICE",
        "HOST",
        "PORT",
        "LOG_FORMAT",
        "DATABASE_URL",
        "JWT_SECRET",
        "MAX_STALLS_PER_USER",
        "SMTP_HOST",
        "SMTP_PORT",
        "QR_CODE_DIR",
        "AUTH_SERVICE_URL",
        "PROFILE_SERVICE_URL",
        "STALL_SERVICE_URL",
        "RESERVATION_SERVICE_URL",
        "NOTIFICATION_SERVICE_URL",
    ];

    fn clear() {
        for key in KEYS {
            // SAFETY: every test touching the environment is #[serial].
            unsafe { std::env::remove_var(key) };
        }
    }

    fn set(key: &str, value: &str) {
        // SAFETY: every test touching the environment is #[serial].
        unsafe { std::env::set_var(key, value) };
    }

    #[test]
    #[serial]
    fn defaults() {
        clear();
        let config = Config::from_env().unwrap();

        assert_eq!(config.service, ServiceKind::All);
        assert_eq!(config.addr(), "0.0.0.0:8090");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
        assert!(config.smtp.is_none());
        assert_eq!(config.max_stalls_per_user, 3);
        assert_eq!(config.peers.stall, "http://localhost:8084");
        assert_eq!(config.peers, Config::default().peers);
        assert_eq!(config.qr_code_dir, Config::default().qr_code_dir);
    }

    #[test]
    fn default_ports_per_service() {
        let ports: Vec<_> = [
            ServiceKind::Auth,
            ServiceKind::Profile,
            ServiceKind::Notification,
            ServiceKind::Reservation,
            ServiceKind::Stall,
            ServiceKind::All,
        ]
        .iter()
        .map(ServiceKind::default_port)
        .collect();
        assert_eq!(ports, [8080, 8081, 8082, 8083, 8084, 8090]);
    }

    #[test]
    #[serial]
    fn per_service_port_and_overrides() {
        clear();
        set("SERVICE", "Reservation");
        set("MAX_STALLS_PER_USER", "5");
        set("STALL_SERVICE_URL", "http://stalls:9000");
        set("LOG_FORMAT", "json");
        set("SMTP_HOST", "mailhog");

        let config = Config::from_env().unwrap();
        clear();

        assert_eq!(config.service, ServiceKind::Reservation);
        assert_eq!(config.port, 8083);
        assert_eq!(config.max_stalls_per_user, 5);
        assert_eq!(config.peers.stall, "http://stalls:9000");
        assert_eq!(config.log_format, LogFormat::Json);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, "mailhog");
        assert_eq!(smtp.port, 1025);
    }

    #[test]
    #[serial]
    fn rejects_bad_values() {
        clear();
        set("SERVICE", "billing");
        assert_eq!(
            Config::from_env().unwrap_err(),
            ConfigError::UnknownService("billing".into())
        );

        clear();
        set("PORT", "eighty");
        assert!(matches!(
            Config::from_env().unwrap_err(),
            ConfigError::InvalidValue { key: "PORT", .. }
        ));
        clear();
    }

    #[test]
    fn all_runs_everything() {
        assert!(ServiceKind::All.runs(ServiceKind::Stall));
        assert!(ServiceKind::Stall.runs(ServiceKind::Stall));
        assert!(!ServiceKind::Stall.runs(ServiceKind::Auth));
    }
}
