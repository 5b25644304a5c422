//! Search query parameters.

use serde::{Deserialize, Serialize};

/// Default page size for searches.
pub const DEFAULT_SEARCH_LIMIT: u32 = 10;

/// Sort, aggregate and paging options for a Lucene search.
///
/// `sort` and `aggregate` are passed to the server untouched, e.g.
/// `value.name:asc` or `value.age:stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    pub sort: Option<String>,
    pub aggregate: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            sort: None,
            aggregate: None,
            limit: DEFAULT_SEARCH_LIMIT,
            offset: 0,
        }
    }
}

impl SearchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    #[must_use]
    pub fn aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// Query parameters for `query`. Empty sort and aggregate strings and a
    /// zero offset are left out.
    pub fn to_query(&self, query: &str) -> Vec<(&'static str, String)> {
        let mut params = vec![("query", query.to_string())];
        if let Some(sort) = self.sort.as_deref().filter(|s| !s.is_empty()) {
            params.push(("sort", sort.to_string()));
        }
        if let Some(aggregate) = self.aggregate.as_deref().filter(|a| !a.is_empty()) {
            params.push(("aggregate", aggregate.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        if self.offset > 0 {
            params.push(("offset", self.offset.to_string()));
        }
        params
    }
}
