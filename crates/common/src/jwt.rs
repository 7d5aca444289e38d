//! JWT issuance and validation.
//!
//! Tokens are HS256-signed and carry the user's id, email, role and
//! company so that downstream services can authorize without calling
//! the auth service.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Role, UserId};

const DEV_SECRET: &str = "bookfair-development-secret-change-me-in-production";

/// Minimum secret length accepted from configuration.
pub const MIN_SECRET_LEN: usize = 32;

/// JWT configuration.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret, at least 32 bytes.
    pub secret: String,
    /// Token lifetime in minutes.
    pub expiration_minutes: i64,
}

impl JwtConfig {
    /// Builds a config from an optional secret.
    ///
    /// A missing secret falls back to a fixed development key and logs a
    /// warning. A secret shorter than [`MIN_SECRET_LEN`] is rejected.
    pub fn new(secret: Option<String>, expiration_minutes: i64) -> Result<Self, JwtError> {
        let secret = match secret {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(JwtError::Config(format!(
                    "JWT_SECRET must be at least {MIN_SECRET_LEN} characters long"
                )));
            }
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set, using the development key");
                DEV_SECRET.to_string()
            }
        };
        Ok(Self {
            secret,
            expiration_minutes,
        })
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEV_SECRET.to_string(),
            expiration_minutes: 300,
        }
    }
}

/// Claims stored in every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Parses the subject back into a user id.
    pub fn user_id(&self) -> Result<UserId, JwtError> {
        self.sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| JwtError::InvalidToken(format!("malformed subject: {}", self.sub)))
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    ExpiredToken,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("expiration_minutes", &self.config.expiration_minutes)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    pub fn expiration_minutes(&self) -> i64 {
        self.config.expiration_minutes
    }

    /// Issues a token for a user.
    pub fn generate_token(
        &self,
        user_id: UserId,
        email: &str,
        role: Role,
        company_name: Option<&str>,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            company_name: company_name.map(str::to_string),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// Validates signature and expiry and returns the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["sub", "exp", "iat"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                _ => JwtError::InvalidToken(e.to_string()),
            }
        })?;

        Ok(data.claims)
    }

    /// Extracts the token from an `Authorization: Bearer ...` header value.
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

impl Default for JwtService {
    fn default() -> Self {
        Self::new(JwtConfig::default())
    }
}
