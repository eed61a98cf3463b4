use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A feed entry as it appears on the wire.
///
/// This is the public projection of an upstream release package. Every field
/// is a direct copy of the source package; an entry never exists without a
/// backing package. Field names follow the protocol's PascalCase convention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct FeedEntry {
    /// Package identifier (e.g. "AcmeWeb").
    pub id: String,

    /// Version string (e.g. "1.2.3").
    pub version: String,

    /// Display title, usually the same as the id.
    pub title: String,

    /// One-line summary.
    pub summary: String,

    /// Longer description.
    pub description: String,

    /// Release notes attached to this version.
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

impl FeedEntry {
    /// The (id, version) identity used for duplicate suppression.
    pub fn key(&self) -> PackageKey {
        PackageKey {
            id: self.id.clone(),
            version: self.version.clone(),
        }
    }
}

/// Errors that can occur when validating a [`PackageKey`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum KeyError {
    /// The package id is empty.
    #[error("Empty package id")]
    EmptyId,
}

/// The (id, version) identity of a package.
///
/// An empty version means "latest" and is valid; an empty id is not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageKey {
    /// Package identifier.
    pub id: String,
    /// Version string; empty means "latest".
    pub version: String,
}

impl PackageKey {
    /// Builds a key from raw request parameters.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// Validates the key for point-lookup use.
    ///
    /// # Errors
    ///
    /// Returns [`KeyError::EmptyId`] if the id is empty.
    pub fn validate(&self) -> Result<(), KeyError> {
        if self.id.is_empty() {
            return Err(KeyError::EmptyId);
        }
        Ok(())
    }
}

impl fmt::Display for PackageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.id)
        } else {
            write!(f, "{} {}", self.id, self.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry() -> FeedEntry {
        FeedEntry {
            id: "AcmeWeb".into(),
            version: "1.2.3".into(),
            title: "AcmeWeb".into(),
            summary: "Acme web frontend".into(),
            description: "Acme web frontend release package".into(),
            release_notes: "Fixes login redirect".into(),
            authors: vec!["deploy-bot".into()],
            published: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            listed: true,
            is_latest_version: true,
            is_absolute_latest_version: true,
            package_size: 1024,
        }
    }

    #[test]
    fn serializes_with_pascal_case_names() {
        let json = serde_json::to_value(entry()).unwrap();
        assert_eq!(json["Id"], "AcmeWeb");
        assert_eq!(json["Version"], "1.2.3");
        assert_eq!(json["ReleaseNotes"], "Fixes login redirect");
        assert_eq!(json["IsAbsoluteLatestVersion"], true);
        assert_eq!(json["PackageSize"], 1024);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn key_round_trips_identity() {
        let key = entry().key();
        assert_eq!(key, PackageKey::new("AcmeWeb", "1.2.3"));
        assert_eq!(key.to_string(), "AcmeWeb 1.2.3");
    }

    #[test]
    fn empty_version_displays_id_only() {
        assert_eq!(PackageKey::new("AcmeWeb", "").to_string(), "AcmeWeb");
    }

    #[test]
    fn validate_rejects_empty_id() {
        assert_eq!(
            PackageKey::new("", "1.0").validate(),
            Err(KeyError::EmptyId)
        );
        assert!(PackageKey::new("AcmeWeb", "").validate().is_ok());
    }
}
