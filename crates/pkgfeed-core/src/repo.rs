//! The repository port: the contract the feed engine requires from the
//! upstream artifact source.
//!
//! One production implementation exists
//! ([`DeploymentServerRepository`](crate::upstream::DeploymentServerRepository));
//! tests use [`StaticRepository`](crate::testing::StaticRepository).

use crate::error::FeedError;
use crate::package::ReleasePackage;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Binary package content, relayed chunk by chunk. Never buffered whole.
pub type ContentStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Advisory hints forwarded with a free-text search. The upstream source is
/// the authority on eligibility; the engine never re-filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    /// Free-text term, possibly empty (matches everything).
    pub term: String,
    /// Include prerelease versions.
    pub include_prerelease: bool,
    /// Include delisted packages.
    pub include_delisted: bool,
}

/// Authenticated access to the upstream artifact source.
///
/// Every call accepts a cancellation signal and observes it promptly: a
/// caller that has gone away must not keep an upstream request running.
/// Transport failures surface as [`FeedError::Upstream`].
#[async_trait]
pub trait PackageRepository: Send + Sync {
    /// Whether the session behind this repository holds valid credentials.
    /// Stateless per call; any failure to verify means "no".
    async fn is_authenticated(&self, cancel: &CancellationToken) -> bool;

    /// Point lookup. An empty `version` means "latest". `Ok(None)` when no
    /// matching artifact exists upstream.
    async fn get_package(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleasePackage>, FeedError>;

    /// All versions of `id` known upstream, newest first. May contain
    /// duplicates; the engine suppresses them.
    async fn find_all_versions(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError>;

    /// Free-text search over the upstream source.
    async fn search(
        &self,
        filter: &SearchFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError>;

    /// Opens the binary content of a previously resolved package.
    async fn open_content(
        &self,
        package: &ReleasePackage,
        cancel: &CancellationToken,
    ) -> Result<ContentStream, FeedError>;
}

#[async_trait]
impl<T: PackageRepository + ?Sized> PackageRepository for std::sync::Arc<T> {
    async fn is_authenticated(&self, cancel: &CancellationToken) -> bool {
        (**self).is_authenticated(cancel).await
    }

    async fn get_package(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleasePackage>, FeedError> {
        (**self).get_package(id, version, cancel).await
    }

    async fn find_all_versions(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        (**self).find_all_versions(id, cancel).await
    }

    async fn search(
        &self,
        filter: &SearchFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        (**self).search(filter, cancel).await
    }

    async fn open_content(
        &self,
        package: &ReleasePackage,
        cancel: &CancellationToken,
    ) -> Result<ContentStream, FeedError> {
        (**self).open_content(package, cancel).await
    }
}
