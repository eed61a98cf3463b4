//! Upstream connection settings.
//!
//! The endpoint is constructed explicitly at startup and handed to the
//! repository by value; there is no hidden first-use initialization.

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the deployment server's base URL.
pub const BASE_URL_VAR: &str = "PKGFEED_UPSTREAM_URL";
/// Environment variable carrying the API key.
pub const API_KEY_VAR: &str = "PKGFEED_API_KEY";

/// Errors raised while loading or validating upstream settings.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A required environment variable is unset or empty.
    #[error("Missing environment variable {0}")]
    MissingVar(&'static str),

    /// The base URL is not an http(s) URL.
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The API key is empty.
    #[error("Empty API key")]
    EmptyApiKey,
}

/// Connection settings for the upstream deployment server. These are the
/// caller's credentials: the API key decides whether the session the
/// repository opens is authenticated.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Server base URL, without a trailing slash.
    pub base_url: String,
    /// API key sent with every upstream request.
    pub api_key: String,
}

impl UpstreamConfig {
    /// Settings from explicit values. The base URL's trailing slash, if
    /// any, is stripped so paths can be appended verbatim.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Settings from `PKGFEED_UPSTREAM_URL` and `PKGFEED_API_KEY`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVar`] when either variable is unset or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env_var(BASE_URL_VAR)?;
        let api_key = env_var(API_KEY_VAR)?;
        Ok(Self::new(base_url, api_key))
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidBaseUrl`] unless the base URL starts with
    /// `http://` or `https://`, [`ConfigError::EmptyApiKey`] for an empty
    /// key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.api_key.is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(())
    }

    /// Host component of the base URL, as reported to telemetry.
    pub fn host(&self) -> &str {
        let after_scheme = self
            .base_url
            .split_once("://")
            .map_or(self.base_url.as_str(), |(_, rest)| rest);
        after_scheme.split('/').next().unwrap_or(after_scheme)
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name)),
    }
}
