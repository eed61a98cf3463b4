//! Test-double repository backed by a static package list.

use crate::error::FeedError;
use crate::package::ReleasePackage;
use crate::repo::{ContentStream, PackageRepository, SearchFilter};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// A package with plausible defaults for tests.
pub fn package(id: &str, version: &str) -> ReleasePackage {
    ReleasePackage {
        id: id.to_string(),
        version: version.to_string(),
        title: id.to_string(),
        summary: format!("{id} release feed"),
        description: format!("Release package for {id}"),
        release_notes: String::new(),
        authors: vec!["deploy-bot".to_string()],
        published: Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap(),
        listed: true,
        is_latest_version: false,
        is_absolute_latest_version: false,
        package_size: 2048,
    }
}

/// An in-memory [`PackageRepository`] over a fixed package list.
///
/// Emulates the upstream source's own eligibility rules: search drops
/// delisted packages unless asked to include them, and treats versions
/// containing `-` as prereleases. Versions of one id are stored newest
/// first, matching the upstream ordering contract.
#[derive(Debug, Default)]
pub struct StaticRepository {
    authenticated: bool,
    packages: Vec<ReleasePackage>,
    content: Vec<u8>,
    queries: AtomicUsize,
    content_opens: AtomicUsize,
}

impl StaticRepository {
    /// An authenticated, empty repository.
    pub fn new() -> Self {
        Self {
            authenticated: true,
            ..Self::default()
        }
    }

    /// Sets whether the session is authenticated.
    pub fn with_authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Replaces the package list.
    pub fn with_packages(mut self, packages: Vec<ReleasePackage>) -> Self {
        self.packages = packages;
        self
    }

    /// Sets the bytes every content stream yields.
    pub fn with_content(mut self, content: Vec<u8>) -> Self {
        self.content = content;
        self
    }

    /// Number of query operations attempted (lookup, find, search).
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    /// Number of times a content stream was opened.
    pub fn content_opens(&self) -> usize {
        self.content_opens.load(Ordering::SeqCst)
    }

    fn check(&self, cancel: &CancellationToken) -> Result<(), FeedError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }
        Ok(())
    }
}

#[async_trait]
impl PackageRepository for StaticRepository {
    async fn is_authenticated(&self, _cancel: &CancellationToken) -> bool {
        self.authenticated
    }

    async fn get_package(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleasePackage>, FeedError> {
        self.check(cancel)?;
        let found = if version.is_empty() {
            self.packages.iter().find(|p| p.id == id)
        } else {
            self.packages
                .iter()
                .find(|p| p.id == id && p.version == version)
        };
        Ok(found.cloned())
    }

    async fn find_all_versions(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        self.check(cancel)?;
        Ok(self
            .packages
            .iter()
            .filter(|p| p.id == id)
            .cloned()
            .collect())
    }

    async fn search(
        &self,
        filter: &SearchFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        self.check(cancel)?;
        Ok(self
            .packages
            .iter()
            .filter(|p| p.id.contains(&filter.term))
            .filter(|p| filter.include_delisted || p.listed)
            .filter(|p| filter.include_prerelease || !p.version.contains('-'))
            .cloned()
            .collect())
    }

    async fn open_content(
        &self,
        _package: &ReleasePackage,
        cancel: &CancellationToken,
    ) -> Result<ContentStream, FeedError> {
        self.content_opens.fetch_add(1, Ordering::SeqCst);
        if cancel.is_cancelled() {
            return Err(FeedError::Cancelled);
        }
        // Split into chunks so consumers exercise real streaming.
        let chunks: Vec<Result<Bytes, std::io::Error>> = self
            .content
            .chunks(4)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
