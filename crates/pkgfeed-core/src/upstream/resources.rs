//! Wire resources of the deployment server's JSON API.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A paged collection as the server returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceCollection<T> {
    /// Items on this page.
    pub items: Vec<T>,
}

/// A deployable project; its name doubles as the feed's package id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProjectResource {
    /// Project name.
    pub name: String,
    /// One-line summary.
    #[serde(default)]
    pub summary: String,
    /// Longer description.
    #[serde(default)]
    pub description: String,
}

/// One release of a project. Release lists arrive newest first.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReleaseResource {
    /// Version string.
    pub version: String,
    /// Release notes, possibly empty.
    #[serde(default)]
    pub release_notes: String,
    /// When the release was assembled.
    pub assembled: DateTime<Utc>,
    /// Who assembled it.
    #[serde(default)]
    pub assembled_by: String,
    /// Size of the packaged binary in bytes.
    #[serde(default)]
    pub package_size: u64,
    /// Whether the release is visible in listings.
    #[serde(default = "default_listed")]
    pub listed: bool,
}

fn default_listed() -> bool {
    true
}
