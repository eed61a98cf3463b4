//! Dispatch of parsed protocol requests to the engine and responder.

use crate::download::{DownloadMode, DownloadResponder, DownloadResponse};
use crate::engine::FeedEngine;
use crate::error::FeedError;
use crate::repo::{PackageRepository, SearchFilter};
use pkgfeed_schema::{FeedEntry, Page, QueryDescriptor};
use tokio_util::sync::CancellationToken;

/// A successful feed response, ready for a host to serialize or relay.
#[derive(Debug)]
pub enum FeedResponse {
    /// A single entry (point lookup).
    Entry(FeedEntry),
    /// A paged collection (find-by-id, search).
    Collection(Page<FeedEntry>),
    /// A binary download (headers, and for GET a body stream).
    Download(DownloadResponse),
}

/// The feed surface: one engine and one responder over a shared repository.
#[derive(Debug)]
pub struct FeedService<R> {
    engine: FeedEngine<R>,
    responder: DownloadResponder<R>,
}

impl<R: PackageRepository + Clone> FeedService<R> {
    /// A service over the given repository. Pass an `Arc<...>` repository
    /// to share one upstream session between engine and responder.
    pub fn new(repo: R) -> Self {
        Self {
            engine: FeedEngine::new(repo.clone()),
            responder: DownloadResponder::new(repo),
        }
    }

    /// Executes one parsed request.
    ///
    /// # Errors
    ///
    /// [`FeedError`]; map to a wire status with
    /// [`FeedError::status_code`].
    pub async fn handle(
        &self,
        request: &QueryDescriptor,
        cancel: &CancellationToken,
    ) -> Result<FeedResponse, FeedError> {
        match request {
            QueryDescriptor::Lookup { id, version } => {
                let entry = self.engine.lookup(id, version, cancel).await?;
                Ok(FeedResponse::Entry(entry))
            }
            QueryDescriptor::FindById { id, options } => {
                let page = self.engine.find_by_id(id, options, cancel).await?;
                Ok(FeedResponse::Collection(page))
            }
            QueryDescriptor::Search {
                term,
                include_prerelease,
                include_delisted,
                options,
            } => {
                let filter = SearchFilter {
                    term: term.clone(),
                    include_prerelease: *include_prerelease,
                    include_delisted: *include_delisted,
                };
                let page = self.engine.search(&filter, options, cancel).await?;
                Ok(FeedResponse::Collection(page))
            }
            QueryDescriptor::Download { id, version, head } => {
                let mode = if *head {
                    DownloadMode::Head
                } else {
                    DownloadMode::Get
                };
                let response = self.responder.respond(id, version, mode, cancel).await?;
                Ok(FeedResponse::Download(response))
            }
        }
    }
}
