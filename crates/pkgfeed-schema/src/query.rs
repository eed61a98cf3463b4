//! Protocol query shaping: `$skip`/`$top` parsing and paging.

/// Hard ceiling on page size. Requests for more are clamped, never rejected;
/// real clients send `$top=40` and expect a truncated page back.
pub const MAX_PAGE_SIZE: usize = 25;

/// Paging directives parsed from a request's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Number of entries to skip before the page starts.
    pub skip: usize,
    /// Requested page size; `None` means "as many as allowed".
    pub top: Option<usize>,
}

impl QueryOptions {
    /// Parses `$skip` and `$top` from a raw query string.
    ///
    /// Unknown keys and unparseable values are ignored; the protocol treats
    /// them as absent rather than failing the request.
    pub fn parse(query: &str) -> Self {
        let mut options = Self::default();
        for pair in query.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            match key {
                "$skip" => {
                    if let Ok(skip) = value.parse() {
                        options.skip = skip;
                    }
                }
                "$top" => {
                    if let Ok(top) = value.parse() {
                        options.top = Some(top);
                    }
                }
                _ => {}
            }
        }
        options
    }

    /// Effective page size after clamping to [`MAX_PAGE_SIZE`].
    pub fn page_size(&self) -> usize {
        self.top.map_or(MAX_PAGE_SIZE, |t| t.min(MAX_PAGE_SIZE))
    }

    /// Applies skip and clamped take to an already-ordered result set.
    pub fn apply<T>(&self, items: Vec<T>) -> Page<T> {
        let total = items.len();
        let entries: Vec<T> = items
            .into_iter()
            .skip(self.skip)
            .take(self.page_size())
            .collect();
        Page {
            entries,
            total,
            skip: self.skip,
        }
    }
}

/// One page of a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Entries on this page, upstream order preserved.
    pub entries: Vec<T>,
    /// Total number of entries before paging.
    pub total: usize,
    /// Offset this page starts at.
    pub skip: usize,
}

impl<T> Page<T> {
    /// An empty, successfully-paged result.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            total: 0,
            skip: 0,
        }
    }

    /// Number of entries on this page.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this page carries no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
