//! The download responder: resolves one artifact and emits it as a byte
//! stream with correct content metadata.

use crate::error::FeedError;
use crate::package::ReleasePackage;
use crate::repo::{ContentStream, PackageRepository};
use chrono::{DateTime, Utc};
use pkgfeed_schema::PACKAGE_EXTENSION;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Content type of every package download.
pub const CONTENT_TYPE: &str = "binary/octet-stream";

/// Whether the caller wants the content or only its metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadMode {
    /// GET semantics: headers plus the full byte stream.
    Get,
    /// HEAD semantics: identical headers, empty body. The upstream content
    /// stream is never opened in this mode.
    Head,
}

/// Content metadata accompanying a download, ready for a host to relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHeaders {
    /// Always [`CONTENT_TYPE`].
    pub content_type: &'static str,
    /// `attachment; filename={Id}.{Version}.nupkg; size={bytes}`.
    pub content_disposition: String,
    /// Byte size of the content, equal to the package's size.
    pub content_length: u64,
    /// The package's publication time.
    pub last_modified: DateTime<Utc>,
}

impl DownloadHeaders {
    fn for_package(package: &ReleasePackage) -> Self {
        let filename = format!(
            "{}.{}.{}",
            package.id, package.version, PACKAGE_EXTENSION
        );
        Self {
            content_type: CONTENT_TYPE,
            content_disposition: format!(
                "attachment; filename={filename}; size={}",
                package.package_size
            ),
            content_length: package.package_size,
            last_modified: package.published,
        }
    }
}

/// A fully-specified download response: headers plus, for GET, the body.
/// Headers and body always describe the same artifact.
pub struct DownloadResponse {
    /// Content metadata headers.
    pub headers: DownloadHeaders,
    /// The byte stream; `None` for HEAD.
    pub body: Option<ContentStream>,
}

// ContentStream has no Debug; show presence only.
impl fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("headers", &self.headers)
            .field("body", &self.body.is_some())
            .finish()
    }
}

/// Resolves a package through the authenticated lookup path and emits its
/// content.
#[derive(Debug)]
pub struct DownloadResponder<R> {
    repo: R,
}

impl<R: PackageRepository> DownloadResponder<R> {
    /// A responder over the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Resolves `id`/`version` and produces the response for `mode`.
    ///
    /// # Errors
    ///
    /// [`FeedError::Forbidden`] for unauthenticated callers,
    /// [`FeedError::NotFound`] naming the requested identity when no
    /// artifact matches. Both are terminal; there is no retry.
    pub async fn respond(
        &self,
        id: &str,
        version: &str,
        mode: DownloadMode,
        cancel: &CancellationToken,
    ) -> Result<DownloadResponse, FeedError> {
        if !self.repo.is_authenticated(cancel).await {
            return Err(FeedError::Forbidden);
        }

        let package = self
            .repo
            .get_package(id, version, cancel)
            .await?
            .ok_or_else(|| FeedError::not_found(id, version))?;

        let headers = DownloadHeaders::for_package(&package);
        let body = match mode {
            DownloadMode::Get => Some(self.repo.open_content(&package, cancel).await?),
            DownloadMode::Head => None,
        };
        Ok(DownloadResponse { headers, body })
    }
}
