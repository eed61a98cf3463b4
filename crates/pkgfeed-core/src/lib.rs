//! Feed query/translation engine.
//!
//! Exposes releases held by a deployment-automation server as a
//! package-manager-compatible feed: point lookup, find-all-versions,
//! free-text search, and binary download. The crate is host-agnostic; an
//! HTTP front end parses requests into
//! [`QueryDescriptor`](pkgfeed_schema::QueryDescriptor)s, hands them to a
//! [`FeedService`](service::FeedService), and relays the resulting
//! responses.

pub mod config;
pub mod download;
pub mod engine;
pub mod error;
pub mod package;
pub mod repo;
pub mod service;
pub mod telemetry;
pub mod testing;
pub mod tracker;
pub mod upstream;

pub use config::UpstreamConfig;
pub use download::{DownloadMode, DownloadResponder, DownloadResponse};
pub use engine::FeedEngine;
pub use error::FeedError;
pub use package::ReleasePackage;
pub use repo::{ContentStream, PackageRepository, SearchFilter};
pub use service::{FeedResponse, FeedService};
pub use telemetry::{FanoutTelemetry, NullTelemetry, Telemetry, TracingTelemetry};
pub use tracker::DependencyTracker;
pub use upstream::DeploymentServerRepository;

/// User Agent string for upstream requests
pub const USER_AGENT: &str = concat!("pkgfeed/", env!("CARGO_PKG_VERSION"));
