//! Production repository over the deployment server's JSON API.
//!
//! Endpoints consumed:
//!
//! - `GET /api` — root document; a 2xx response proves the API key.
//! - `GET /api/projects/{name}` — one project, 404 when unknown.
//! - `GET /api/projects/{name}/releases` — releases, newest first.
//! - `GET /api/projects?partialName={term}` — project search.
//! - `GET /api/projects/{name}/releases/{version}/package` — binary content.
//!
//! URLs are assembled from path segments and query pairs, never by string
//! interpolation: ids, versions, and search terms are caller-supplied text
//! and must stay confined to the one segment or parameter they were given
//! as. Every outbound call is registered with the dependency tracker before
//! it is sent and completed when its response arrives; calls that error or
//! are cancelled stay pending until the tracker's staleness sweep discards
//! them.

pub mod resources;

use crate::config::{ConfigError, UpstreamConfig};
use crate::error::FeedError;
use crate::package::ReleasePackage;
use crate::repo::{ContentStream, PackageRepository, SearchFilter};
use crate::telemetry::Telemetry;
use crate::tracker::DependencyTracker;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Url;
use resources::{ProjectResource, ReleaseResource, ResourceCollection};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Header carrying the API key on every upstream request.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Dependency name under which upstream calls are reported.
const DEPENDENCY_NAME: &str = "Deployment Server API";

/// The production [`PackageRepository`]: an authenticated session against
/// one deployment server.
#[derive(Debug)]
pub struct DeploymentServerRepository {
    config: UpstreamConfig,
    base: Url,
    host: String,
    http: reqwest::Client,
    tracker: Arc<DependencyTracker>,
}

impl DeploymentServerRepository {
    /// Opens a session with the given settings. The HTTP client is built
    /// here, at startup, and reused for the session's lifetime.
    ///
    /// # Errors
    ///
    /// [`FeedError::Config`] for invalid settings,
    /// [`FeedError::Upstream`] when the HTTP client cannot be built.
    pub fn new(config: UpstreamConfig, telemetry: Arc<dyn Telemetry>) -> Result<Self, FeedError> {
        config.validate()?;
        let base = Url::parse(&config.base_url)
            .map_err(|_| ConfigError::InvalidBaseUrl(config.base_url.clone()))?;
        let http = reqwest::Client::builder()
            .user_agent(crate::USER_AGENT)
            .build()?;
        let tracker = Arc::new(DependencyTracker::new(
            DEPENDENCY_NAME,
            config.base_url.clone(),
            telemetry,
        ));
        let host = config.host().to_string();
        Ok(Self {
            config,
            base,
            host,
            http,
            tracker,
        })
    }

    /// The tracker timing this session's outbound calls.
    pub fn tracker(&self) -> &DependencyTracker {
        &self.tracker
    }

    /// Builds an endpoint URL. Segments are percent-encoded individually
    /// and query pairs go through the URL's own form encoding, so
    /// caller-supplied text cannot smuggle in extra segments or parameters.
    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, FeedError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidBaseUrl(self.config.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends one tracked GET. A cancelled or failed send leaves the tracker
    /// entry pending; the staleness sweep discards it without a report.
    async fn send(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<reqwest::Response, FeedError> {
        let url = self.endpoint(segments, query)?;
        let call = self.tracker.register(&self.host, &path_and_query(&url));
        let request = self
            .http
            .get(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .send();
        let response = tokio::select! {
            () = cancel.cancelled() => return Err(FeedError::Cancelled),
            result = request => result?,
        };
        self.tracker.complete(call, response.status().as_u16())?;
        Ok(response)
    }

    /// Tracked GET of a JSON resource; 404 becomes `None`.
    async fn get_json_opt<T: serde::de::DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        cancel: &CancellationToken,
    ) -> Result<Option<T>, FeedError> {
        let response = self.send(segments, query, cancel).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json().await?))
    }

    async fn project(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ProjectResource>, FeedError> {
        self.get_json_opt(&["api", "projects", name], &[], cancel)
            .await
    }

    async fn releases(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleaseResource>, FeedError> {
        let collection: Option<ResourceCollection<ReleaseResource>> = self
            .get_json_opt(&["api", "projects", name, "releases"], &[], cancel)
            .await?;
        Ok(collection.map(|c| c.items).unwrap_or_default())
    }
}

/// Path plus query of an endpoint, as reported to telemetry.
fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_string(),
    }
}

/// Builds a package from a project and one of its releases. `index` is the
/// release's position in the newest-first list; position zero is the latest.
fn assemble(project: &ProjectResource, release: &ReleaseResource, index: usize) -> ReleasePackage {
    ReleasePackage {
        id: project.name.clone(),
        version: release.version.clone(),
        title: project.name.clone(),
        summary: project.summary.clone(),
        description: project.description.clone(),
        release_notes: release.release_notes.clone(),
        authors: if release.assembled_by.is_empty() {
            Vec::new()
        } else {
            vec![release.assembled_by.clone()]
        },
        published: release.assembled,
        listed: release.listed,
        is_latest_version: index == 0,
        is_absolute_latest_version: index == 0,
        package_size: release.package_size,
    }
}

#[async_trait]
impl PackageRepository for DeploymentServerRepository {
    async fn is_authenticated(&self, cancel: &CancellationToken) -> bool {
        match self.send(&["api"], &[], cancel).await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn get_package(
        &self,
        id: &str,
        version: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<ReleasePackage>, FeedError> {
        let Some(project) = self.project(id, cancel).await? else {
            return Ok(None);
        };
        let releases = self.releases(id, cancel).await?;

        let found = if version.is_empty() {
            releases.first().map(|release| (release, 0))
        } else {
            releases
                .iter()
                .enumerate()
                .find(|(_, release)| release.version == version)
                .map(|(index, release)| (release, index))
        };
        Ok(found.map(|(release, index)| assemble(&project, release, index)))
    }

    async fn find_all_versions(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        let Some(project) = self.project(id, cancel).await? else {
            return Ok(Vec::new());
        };
        let releases = self.releases(id, cancel).await?;
        Ok(releases
            .iter()
            .enumerate()
            .map(|(index, release)| assemble(&project, release, index))
            .collect())
    }

    async fn search(
        &self,
        filter: &SearchFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<ReleasePackage>, FeedError> {
        let include_prerelease = filter.include_prerelease.to_string();
        let include_delisted = filter.include_delisted.to_string();
        let query = [
            ("partialName", filter.term.as_str()),
            ("includePrerelease", include_prerelease.as_str()),
            ("includeDelisted", include_delisted.as_str()),
        ];
        let collection: Option<ResourceCollection<ProjectResource>> = self
            .get_json_opt(&["api", "projects"], &query, cancel)
            .await?;
        let projects = collection.map(|c| c.items).unwrap_or_default();

        // One package per matching project: its latest release.
        let mut packages = Vec::with_capacity(projects.len());
        for project in &projects {
            let releases = self.releases(&project.name, cancel).await?;
            if let Some(release) = releases.first() {
                packages.push(assemble(project, release, 0));
            }
        }
        Ok(packages)
    }

    async fn open_content(
        &self,
        package: &ReleasePackage,
        cancel: &CancellationToken,
    ) -> Result<ContentStream, FeedError> {
        let segments = [
            "api",
            "projects",
            package.id.as_str(),
            "releases",
            package.version.as_str(),
            "package",
        ];
        let response = self.send(&segments, &[], cancel).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FeedError::not_found(&package.id, &package.version));
        }
        let response = response.error_for_status()?;
        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::RecordingTelemetry;
    use mockito::{Matcher, Server, ServerGuard};

    const PROJECT_BODY: &str =
        r#"{"Name":"AcmeWeb","Summary":"Acme web frontend","Description":"Frontend releases"}"#;
    const RELEASES_BODY: &str = r#"{"Items":[
        {"Version":"2.0.0","Assembled":"2024-03-01T12:00:00Z","AssembledBy":"deploy-bot","PackageSize":10,"ReleaseNotes":"Second"},
        {"Version":"1.0.0","Assembled":"2024-01-15T09:30:00Z","AssembledBy":"deploy-bot","PackageSize":8,"ReleaseNotes":"First"}
    ]}"#;

    async fn repository(
        server: &ServerGuard,
    ) -> (DeploymentServerRepository, Arc<RecordingTelemetry>) {
        let telemetry = Arc::new(RecordingTelemetry::new());
        let config = UpstreamConfig::new(server.url(), "test-key");
        let repo = DeploymentServerRepository::new(config, telemetry.clone()).unwrap();
        (repo, telemetry)
    }

    fn cancel() -> CancellationToken {
        CancellationToken::new()
    }

    #[tokio::test]
    async fn root_document_decides_authentication() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_header(API_KEY_HEADER, "test-key")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let (repo, telemetry) = repository(&server).await;

        assert!(repo.is_authenticated(&cancel()).await);
        mock.assert_async().await;

        let reports = telemetry.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].path, "/api");
        assert!(reports[0].success);
    }

    #[tokio::test]
    async fn rejected_credentials_are_not_authenticated() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api")
            .with_status(401)
            .create_async()
            .await;
        let (repo, telemetry) = repository(&server).await;

        assert!(!repo.is_authenticated(&cancel()).await);
        let reports = telemetry.reports();
        assert_eq!(reports[0].result_code, "401");
        assert!(!reports[0].success);
    }

    #[tokio::test]
    async fn get_package_with_empty_version_resolves_the_latest_release() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects/AcmeWeb")
            .with_body(PROJECT_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/api/projects/AcmeWeb/releases")
            .with_body(RELEASES_BODY)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let package = repo
            .get_package("AcmeWeb", "", &cancel())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.version, "2.0.0");
        assert_eq!(package.summary, "Acme web frontend");
        assert_eq!(package.authors, vec!["deploy-bot".to_string()]);
        assert!(package.is_latest_version);
        assert_eq!(package.package_size, 10);
    }

    #[tokio::test]
    async fn get_package_resolves_a_specific_version_without_latest_flags() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects/AcmeWeb")
            .with_body(PROJECT_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/api/projects/AcmeWeb/releases")
            .with_body(RELEASES_BODY)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let package = repo
            .get_package("AcmeWeb", "1.0.0", &cancel())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(package.version, "1.0.0");
        assert!(!package.is_latest_version);
        assert_eq!(package.release_notes, "First");
    }

    #[tokio::test]
    async fn unknown_projects_resolve_to_none() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects/Ghost")
            .with_status(404)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        assert!(repo.get_package("Ghost", "", &cancel()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_all_versions_preserves_newest_first_order() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects/AcmeWeb")
            .with_body(PROJECT_BODY)
            .create_async()
            .await;
        server
            .mock("GET", "/api/projects/AcmeWeb/releases")
            .with_body(RELEASES_BODY)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let packages = repo.find_all_versions("AcmeWeb", &cancel()).await.unwrap();
        assert_eq!(packages.len(), 2);
        assert_eq!(packages[0].version, "2.0.0");
        assert!(packages[0].is_latest_version);
        assert!(!packages[1].is_latest_version);
    }

    #[tokio::test]
    async fn search_yields_the_latest_release_per_matching_project() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("partialName".into(), "Acme".into()),
                Matcher::UrlEncoded("includePrerelease".into(), "false".into()),
                Matcher::UrlEncoded("includeDelisted".into(), "false".into()),
            ]))
            .with_body(r#"{"Items":[{"Name":"AcmeWeb"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/api/projects/AcmeWeb/releases")
            .with_body(RELEASES_BODY)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let filter = SearchFilter {
            term: "Acme".into(),
            ..SearchFilter::default()
        };
        let packages = repo.search(&filter, &cancel()).await.unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].id, "AcmeWeb");
        assert_eq!(packages[0].version, "2.0.0");
    }

    #[tokio::test]
    async fn search_terms_with_metacharacters_stay_one_parameter() {
        let mut server = Server::new_async().await;
        // The mock only answers when the whole term arrives as a single
        // encoded parameter and the caller's flag survives unchanged; a
        // term that split into extra parameters would miss it.
        let mock = server
            .mock("GET", "/api/projects")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("partialName".into(), "Acme&includeDelisted=true".into()),
                Matcher::UrlEncoded("includePrerelease".into(), "false".into()),
                Matcher::UrlEncoded("includeDelisted".into(), "false".into()),
            ]))
            .with_body(r#"{"Items":[]}"#)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let filter = SearchFilter {
            term: "Acme&includeDelisted=true".into(),
            ..SearchFilter::default()
        };
        let packages = repo.search(&filter, &cancel()).await.unwrap();
        assert!(packages.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn project_ids_with_path_characters_stay_one_segment() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/projects/Acme%2FWeb%20App")
            .with_status(404)
            .create_async()
            .await;
        let (repo, _) = repository(&server).await;

        let package = repo.get_package("Acme/Web App", "", &cancel()).await.unwrap();
        assert!(package.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn open_content_relays_the_byte_stream() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects/AcmeWeb/releases/2.0.0/package")
            .with_body("PKGBYTES")
            .create_async()
            .await;
        let (repo, telemetry) = repository(&server).await;

        let package = assemble(
            &serde_json::from_str(PROJECT_BODY).unwrap(),
            &serde_json::from_str::<ResourceCollection<ReleaseResource>>(RELEASES_BODY)
                .unwrap()
                .items[0],
            0,
        );
        let mut stream = repo.open_content(&package, &cancel()).await.unwrap();

        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            bytes.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(bytes, b"PKGBYTES");

        let reports = telemetry.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].path, "/api/projects/AcmeWeb/releases/2.0.0/package");
    }

    #[tokio::test]
    async fn cancelled_calls_abort_and_leave_the_entry_for_the_sweep() {
        let server = Server::new_async().await;
        let (repo, telemetry) = repository(&server).await;

        let token = CancellationToken::new();
        token.cancel();
        let err = repo.get_package("AcmeWeb", "", &token).await.unwrap_err();
        assert!(matches!(err, FeedError::Cancelled));

        // Abandoned, not reported; the staleness sweep will discard it.
        assert_eq!(repo.tracker().pending_calls(), 1);
        assert!(telemetry.reports().is_empty());
    }
}
