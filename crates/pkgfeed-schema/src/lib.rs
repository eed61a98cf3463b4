pub mod entry;
pub mod query;
pub mod route;

// Re-exports
pub use entry::{FeedEntry, KeyError, PackageKey};
pub use query::{MAX_PAGE_SIZE, Page, QueryOptions};
pub use route::{QueryDescriptor, RouteError};

/// File extension of a packaged artifact, used when computing download filenames.
pub const PACKAGE_EXTENSION: &str = "nupkg";
