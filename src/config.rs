//! Configuration for the token authority.
//!
//! Loaded from environment variables (and a `.env` file if present) and
//! validated before any component is built.

use crate::error::TokenError;
use crate::observability::TracingConfig;
use std::env;
use std::time::Duration;
use url::Url;

/// Token issuance and verification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JwtConfig {
    /// `iss` written on issue and required on verify
    pub issuer: String,
    /// `aud` written on issue and required on verify
    pub audience: String,
    /// Lifetime of issued tokens
    pub expiry: Duration,
}

/// Remote key set cache settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySetCacheConfig {
    /// Published key set address
    pub jwks_url: Url,
    /// How long a successful refresh stays valid
    pub lifetime: Duration,
    /// Per-request timeout for the fetch
    pub fetch_timeout: Duration,
}

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token settings
    pub jwt: JwtConfig,
    /// Maximum age of retained signing keys; zero disables pruning
    pub key_max_age: Duration,
    /// Remote key set cache settings
    pub jwks_cache: KeySetCacheConfig,
    /// Log output settings
    pub tracing: TracingConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is unparseable or a value is invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();

        let jwt = JwtConfig {
            issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "auth-platform".to_string()),
            audience: env::var("JWT_AUDIENCE").unwrap_or_else(|_| "auth-platform".to_string()),
            expiry: Duration::from_secs(parse_env("JWT_EXPIRY_SECS", 900)?),
        };

        let jwks_cache = KeySetCacheConfig {
            jwks_url: parse_url_env(
                "JWKS_URL",
                "http://localhost:8080/.well-known/jwks.json",
            )?,
            lifetime: Duration::from_secs(parse_env("JWKS_CACHE_TTL_SECS", 300)?),
            fetch_timeout: Duration::from_secs(parse_env("JWKS_FETCH_TIMEOUT_SECS", 10)?),
        };

        let tracing = TracingConfig::default()
            .level(env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()))
            .json(parse_env("LOG_JSON", false)?);

        let config = Self {
            jwt,
            key_max_age: Duration::from_secs(parse_env("SIGNING_KEY_MAX_AGE_SECS", 0)?),
            jwks_cache,
            tracing,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.jwt.issuer.is_empty() {
            return Err(TokenError::config("JWT_ISSUER must not be empty"));
        }
        if self.jwt.audience.is_empty() {
            return Err(TokenError::config("JWT_AUDIENCE must not be empty"));
        }
        if self.jwt.expiry.is_zero() {
            return Err(TokenError::config("JWT_EXPIRY_SECS must be greater than 0"));
        }
        if self.jwks_cache.fetch_timeout.is_zero() {
            return Err(TokenError::config(
                "JWKS_FETCH_TIMEOUT_SECS must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TokenError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn parse_url_env(name: &str, default: &str) -> Result<Url, TokenError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let url = Url::parse(&raw).map_err(|e| TokenError::config(format!("Invalid {name}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(TokenError::config(format!(
            "Invalid {name}: unsupported scheme {other}"
        ))),
    }
}
