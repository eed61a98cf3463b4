//! The query translation engine: converts protocol queries into repository
//! calls and composes paged, ordered, de-duplicated result sets.

use crate::error::FeedError;
use crate::package::ReleasePackage;
use crate::repo::{PackageRepository, SearchFilter};
use pkgfeed_schema::{FeedEntry, Page, PackageKey, QueryOptions};
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;

/// Translates feed queries into calls against a [`PackageRepository`].
///
/// Every operation gates on authentication first and short-circuits with
/// [`FeedError::Forbidden`] before any upstream query executes. Results
/// preserve upstream ordering; paging clamps to
/// [`MAX_PAGE_SIZE`](pkgfeed_schema::MAX_PAGE_SIZE).
#[derive(Debug)]
pub struct FeedEngine<R> {
    repo: R,
}

impl<R: PackageRepository> FeedEngine<R> {
    /// An engine over the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Point lookup of one package. An empty `version` means "latest".
    ///
    /// # Errors
    ///
    /// [`FeedError::Forbidden`] for unauthenticated callers,
    /// [`FeedError::NotFound`] when nothing matches (including an empty id).
    pub async fn lookup(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<FeedEntry, FeedError> {
        self.ensure_authenticated(cancel).await?;
        if id.is_empty() {
            return Err(FeedError::not_found(id, version));
        }
        match self.repo.get_package(id, version, cancel).await? {
            Some(package) => Ok(FeedEntry::from(&package)),
            None => Err(FeedError::not_found(id, version)),
        }
    }

    /// All versions of `id`, each exactly once.
    ///
    /// An empty id yields an empty, successfully-paged collection rather
    /// than an error; clients probe with empty ids.
    pub async fn find_by_id(
        &self,
        id: &str,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Page<FeedEntry>, FeedError> {
        self.ensure_authenticated(cancel).await?;
        if id.is_empty() {
            return Ok(Page::empty());
        }
        let packages = self.repo.find_all_versions(id, cancel).await?;
        Ok(options.apply(distinct_entries(&packages)))
    }

    /// Free-text search. The prerelease/delisted flags ride along to the
    /// repository as advisory hints; the engine does not re-filter.
    pub async fn search(
        &self,
        filter: &SearchFilter,
        options: &QueryOptions,
        cancel: &CancellationToken,
    ) -> Result<Page<FeedEntry>, FeedError> {
        self.ensure_authenticated(cancel).await?;
        let packages = self.repo.search(filter, cancel).await?;
        Ok(options.apply(distinct_entries(&packages)))
    }

    async fn ensure_authenticated(&self, cancel: &CancellationToken) -> Result<(), FeedError> {
        if self.repo.is_authenticated(cancel).await {
            Ok(())
        } else {
            Err(FeedError::Forbidden)
        }
    }
}

/// Projects packages to wire entries, suppressing duplicate (id, version)
/// pairs. Stable: the first occurrence wins, upstream order is preserved.
fn distinct_entries(packages: &[ReleasePackage]) -> Vec<FeedEntry> {
    let mut seen: HashSet<PackageKey> = HashSet::new();
    packages
        .iter()
        .filter(|package| seen.insert(package.key()))
        .map(FeedEntry::from)
        .collect()
}
