//! Error taxonomy for feed operations.

use crate::config::ConfigError;
use crate::tracker::TrackerError;
use thiserror::Error;

/// Everything a feed operation can fail with.
///
/// The first two variants are client-facing protocol outcomes; the rest are
/// server-side conditions a host should surface as 5xx responses.
#[derive(Error, Debug)]
pub enum FeedError {
    /// The caller's session holds no valid upstream credentials. Checked
    /// before any upstream query executes.
    #[error("Not authenticated")]
    Forbidden,

    /// No artifact matches the requested identity.
    #[error("Package {id} {version} not found")]
    NotFound {
        /// Requested package id.
        id: String,
        /// Requested version ("" for latest).
        version: String,
    },

    /// Transport or connectivity failure talking to the artifact source.
    /// Not retried at this layer; callers may retry the whole request.
    #[error("Upstream unavailable: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The caller abandoned the request before the upstream call finished.
    #[error("Operation cancelled")]
    Cancelled,

    /// A programming-contract violation in the dependency tracker.
    #[error("Contract violation: {0}")]
    Contract(#[from] TrackerError),

    /// Invalid upstream connection settings.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local IO failure while relaying content.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FeedError {
    /// HTTP status a host should map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Forbidden => 403,
            Self::NotFound { .. } => 404,
            Self::Upstream(_) => 502,
            // Non-standard but widely understood "client closed request".
            Self::Cancelled => 499,
            Self::Contract(_) | Self::Config(_) | Self::Io(_) => 500,
        }
    }

    /// Convenience constructor carrying the requested identity.
    pub fn not_found(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self::NotFound {
            id: id.into(),
            version: version.into(),
        }
    }
}
