use thiserror::Error;

/// Failures while building an adapter. Request failures surface as `PortError`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid mail configuration: {0}")]
    Mail(String),
}
