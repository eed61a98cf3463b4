//! Parsing of protocol-shaped requests into query descriptors.
//!
//! The feed is hosted behind an arbitrary HTTP front end; this module maps
//! the method + path + query string it relays onto the four feed operations.
//! Paths follow the OData-flavoured shapes the protocol's clients emit:
//!
//! - `GET /Packages(Id='x',Version='y')`
//! - `GET|POST /FindPackagesById()?id=x`
//! - `GET|POST /Search()?searchTerm=x&includePrerelease=false`
//! - `GET|HEAD /Packages(Id='x',Version='y')/Download`

use crate::query::QueryOptions;

/// Errors produced while parsing a request into a [`QueryDescriptor`].
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum RouteError {
    /// The path does not name a feed operation.
    #[error("Unknown route: {0}")]
    UnknownRoute(String),

    /// The operation exists but not for this method.
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// Request method as received.
        method: String,
        /// Request path as received.
        path: String,
    },

    /// A `Packages(...)` segment was malformed.
    #[error("Malformed package reference: {0}")]
    MalformedReference(String),
}

/// A parsed caller request: which operation, with which arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryDescriptor {
    /// Point lookup of one package by id and version.
    Lookup {
        /// Package id, must be non-empty.
        id: String,
        /// Version; empty means "latest".
        version: String,
    },
    /// All versions of one id.
    FindById {
        /// Package id; empty yields an empty collection.
        id: String,
        /// Paging directives.
        options: QueryOptions,
    },
    /// Free-text search.
    Search {
        /// Search term, possibly empty.
        term: String,
        /// Advisory hint: include prerelease versions.
        include_prerelease: bool,
        /// Advisory hint: include delisted packages.
        include_delisted: bool,
        /// Paging directives.
        options: QueryOptions,
    },
    /// Binary download of one package.
    Download {
        /// Package id, must be non-empty.
        id: String,
        /// Version; empty means "latest".
        version: String,
        /// True for HEAD semantics: headers only, content never opened.
        head: bool,
    },
}

impl QueryDescriptor {
    /// Parses a request line into a descriptor.
    ///
    /// `method` is matched case-insensitively. `path` excludes the query
    /// string, which is passed separately (empty when absent).
    ///
    /// # Errors
    ///
    /// Returns [`RouteError`] when the path is unknown, the method does not
    /// fit the operation, or a `Packages(...)` reference is malformed.
    pub fn parse(method: &str, path: &str, query: &str) -> Result<Self, RouteError> {
        let method = method.to_ascii_uppercase();

        if let Some(rest) = path.strip_prefix("/Packages(") {
            let Some((args, tail)) = rest.split_once(')') else {
                return Err(RouteError::MalformedReference(path.to_string()));
            };
            let (id, version) = parse_package_args(args)
                .ok_or_else(|| RouteError::MalformedReference(path.to_string()))?;

            return match (tail, method.as_str()) {
                ("", "GET") => Ok(Self::Lookup { id, version }),
                ("/Download", "GET") => Ok(Self::Download {
                    id,
                    version,
                    head: false,
                }),
                ("/Download", "HEAD") => Ok(Self::Download {
                    id,
                    version,
                    head: true,
                }),
                ("" | "/Download", _) => Err(RouteError::MethodNotAllowed {
                    method,
                    path: path.to_string(),
                }),
                _ => Err(RouteError::UnknownRoute(path.to_string())),
            };
        }

        match path {
            "/FindPackagesById()" => {
                if method != "GET" && method != "POST" {
                    return Err(RouteError::MethodNotAllowed {
                        method,
                        path: path.to_string(),
                    });
                }
                Ok(Self::FindById {
                    id: query_value(query, "id").unwrap_or_default(),
                    options: QueryOptions::parse(query),
                })
            }
            "/Search()" => {
                if method != "GET" && method != "POST" {
                    return Err(RouteError::MethodNotAllowed {
                        method,
                        path: path.to_string(),
                    });
                }
                Ok(Self::Search {
                    term: query_value(query, "searchTerm").unwrap_or_default(),
                    include_prerelease: query_flag(query, "includePrerelease"),
                    include_delisted: query_flag(query, "includeDelisted"),
                    options: QueryOptions::parse(query),
                })
            }
            _ => Err(RouteError::UnknownRoute(path.to_string())),
        }
    }
}

/// Extracts `Id` and `Version` from the argument list of `Packages(...)`.
/// Values may be quoted (`Id='Foo'`) or bare (`Id=Foo`).
fn parse_package_args(args: &str) -> Option<(String, String)> {
    let mut id = None;
    let mut version = None;
    for part in args.split(',') {
        let (key, value) = part.split_once('=')?;
        let value = value.trim_matches('\'');
        match key.trim() {
            "Id" => id = Some(value.to_string()),
            "Version" => version = Some(value.to_string()),
            _ => return None,
        }
    }
    Some((id?, version.unwrap_or_default()))
}

fn query_value(query: &str, key: &str) -> Option<String> {
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then(|| v.trim_matches('\'').to_string())
    })
}

fn query_flag(query: &str, key: &str) -> bool {
    query_value(query, key).is_some_and(|v| v == "true")
}
