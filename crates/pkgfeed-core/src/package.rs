//! The release package as produced by the upstream artifact source.

use chrono::{DateTime, Utc};
use pkgfeed_schema::{FeedEntry, PackageKey};

/// A versioned release unit retrieved from the deployment server.
///
/// Constructed per query from upstream data, never mutated afterwards, and
/// discarded once the response is serialized. Binary content is not part of
/// this type; it is obtained lazily through the repository port.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleasePackage {
    /// Package identifier, non-empty.
    pub id: String,
    /// Version string, non-empty.
    pub version: String,
    /// Display title.
    pub title: String,
    /// One-line summary.
    pub summary: String,
    /// Longer description.
    pub description: String,
    /// Release notes for this version.
    pub release_notes: String,
    /// Authors, in upstream order.
    pub authors: Vec<String>,
    /// When the release was assembled upstream.
    pub published: DateTime<Utc>,
    /// Whether the package is visible in listings.
    pub listed: bool,
    /// True on at most one version per id.
    pub is_latest_version: bool,
    /// True on at most one version per id, prereleases included.
    pub is_absolute_latest_version: bool,
    /// Size of the binary content in bytes.
    pub package_size: u64,
}

impl ReleasePackage {
    /// The (id, version) identity used for duplicate suppression.
    pub fn key(&self) -> PackageKey {
        PackageKey::new(self.id.clone(), self.version.clone())
    }
}

impl From<&ReleasePackage> for FeedEntry {
    fn from(package: &ReleasePackage) -> Self {
        Self {
            id: package.id.clone(),
            version: package.version.clone(),
            title: package.title.clone(),
            summary: package.summary.clone(),
            description: package.description.clone(),
            release_notes: package.release_notes.clone(),
            authors: package.authors.clone(),
            published: package.published,
            listed: package.listed,
            is_latest_version: package.is_latest_version,
            is_absolute_latest_version: package.is_absolute_latest_version,
            package_size: package.package_size,
        }
    }
}
