//! Request-scoped search filter.
//!
//! # Invariants
//! - Operations that need the wrapped query fail with
//!   `RepoError::Prerequisite` while no query is set.
//! - Defaults: 50 items per page, pagination enabled.

use super::Searchable;
use crate::model::Model;
use crate::query::Query;
use crate::repo::{RepoError, RepoResult};
use std::fmt;

/// Default page size for filters.
pub const DEFAULT_PER_PAGE: u32 = 50;

/// Read side of a filter, as consumed by repository listing operations.
pub trait Filterable<M: Model> {
    /// Base query for the listing.
    fn query(&self) -> RepoResult<&Query<M>>;
    fn per_page(&self) -> u32;
    /// When `false` the listing returns every match as one page.
    fn is_paginated(&self) -> bool;
}

/// Wraps a query with search text, default ordering and page settings.
///
/// The wrapped query is reached through [`SearchFilter::query_mut`] or
/// [`SearchFilter::map_query`].
pub struct SearchFilter<M> {
    query: Option<Query<M>>,
    per_page: u32,
    paginated: bool,
}

impl<M> Clone for SearchFilter<M> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            per_page: self.per_page,
            paginated: self.paginated,
        }
    }
}

impl<M> fmt::Debug for SearchFilter<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchFilter")
            .field("query", &self.query)
            .field("per_page", &self.per_page)
            .field("paginated", &self.paginated)
            .finish()
    }
}

impl<M: Model> Default for SearchFilter<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> SearchFilter<M> {
    pub fn new() -> Self {
        Self {
            query: None,
            per_page: DEFAULT_PER_PAGE,
            paginated: true,
        }
    }

    pub fn with_query(query: Query<M>) -> Self {
        let mut filter = Self::new();
        filter.set_query(query);
        filter
    }

    pub fn set_query(&mut self, query: Query<M>) -> &mut Self {
        self.query = Some(query);
        self
    }

    pub fn has_query(&self) -> bool {
        self.query.is_some()
    }

    pub fn query(&self) -> RepoResult<&Query<M>> {
        self.query.as_ref().ok_or_else(query_unset)
    }

    pub fn query_mut(&mut self) -> RepoResult<&mut Query<M>> {
        self.query.as_mut().ok_or_else(query_unset)
    }

    /// Replaces the wrapped query with `f(query)`.
    pub fn map_query(&mut self, f: impl FnOnce(Query<M>) -> Query<M>) -> RepoResult<&mut Self> {
        let query = self.query.take().ok_or_else(query_unset)?;
        self.query = Some(f(query));
        Ok(self)
    }

    pub fn into_query(self) -> RepoResult<Query<M>> {
        self.query.ok_or_else(query_unset)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn set_per_page(&mut self, per_page: u32) -> &mut Self {
        self.per_page = per_page;
        self
    }

    pub fn paginate(&mut self, value: bool) -> &mut Self {
        self.paginated = value;
        self
    }

    pub fn is_paginated(&self) -> bool {
        self.paginated
    }
}

impl<M: Searchable> SearchFilter<M> {
    /// Applies the text search for non-blank `text`, then orders by the
    /// primary key descending.
    pub fn set_query_defaults(&mut self, text: Option<&str>) -> RepoResult<&mut Self> {
        let text = text.map(str::trim).filter(|text| !text.is_empty());
        self.map_query(|query| {
            let query = match text {
                Some(text) => M::apply_text_search(query, text),
                None => query,
            };
            query.order_by_desc(M::PRIMARY_KEY)
        })
    }
}

impl<M: Model> Filterable<M> for SearchFilter<M> {
    fn query(&self) -> RepoResult<&Query<M>> {
        SearchFilter::query(self)
    }

    fn per_page(&self) -> u32 {
        SearchFilter::per_page(self)
    }

    fn is_paginated(&self) -> bool {
        SearchFilter::is_paginated(self)
    }
}

fn query_unset() -> RepoError {
    RepoError::Prerequisite("search filter has no query; call `set_query()` first".to_string())
}

#[cfg(test)]
mod tests {
    use super::{SearchFilter, DEFAULT_PER_PAGE};
    use crate::model::Model;
    use crate::query::Query;
    use crate::repo::RepoError;
    use crate::search::Searchable;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Item {
        id: Option<i64>,
        name: String,
    }

    impl Model for Item {
        const TABLE: &'static str = "items";

        fn columns() -> &'static [&'static str] {
            &["id", "name"]
        }
    }

    impl Searchable for Item {
        fn searchable_fields() -> &'static [&'static str] {
            &["name"]
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let filter = SearchFilter::<Item>::new();
        assert_eq!(filter.per_page(), DEFAULT_PER_PAGE);
        assert!(filter.is_paginated());
        assert!(!filter.has_query());
    }

    #[test]
    fn set_query_defaults_requires_a_query() {
        let mut filter = SearchFilter::<Item>::new();
        let err = filter.set_query_defaults(Some("foo")).unwrap_err();
        assert!(matches!(err, RepoError::Prerequisite(_)));
        assert!(matches!(filter.query_mut(), Err(RepoError::Prerequisite(_))));
    }

    #[test]
    fn set_query_defaults_adds_search_and_descending_key_order() {
        let mut filter = SearchFilter::with_query(Query::<Item>::new());
        filter.set_query_defaults(Some("foo")).unwrap();

        let (sql, _) = filter.query().unwrap().to_sql().unwrap();
        assert_eq!(
            sql,
            "SELECT \"items\".* FROM \"items\" WHERE (\"name\" LIKE ? ESCAPE '\\') ORDER BY \"id\" DESC"
        );
    }

    #[test]
    fn blank_text_only_adds_ordering() {
        let mut filter = SearchFilter::with_query(Query::<Item>::new());
        filter.set_query_defaults(Some("   ")).unwrap();

        let (sql, binds) = filter.query().unwrap().to_sql().unwrap();
        assert_eq!(sql, "SELECT \"items\".* FROM \"items\" ORDER BY \"id\" DESC");
        assert!(binds.is_empty());
    }

    #[test]
    fn setters_chain() {
        let mut filter = SearchFilter::<Item>::new();
        filter.set_per_page(10).paginate(false);
        assert_eq!(filter.per_page(), 10);
        assert!(!filter.is_paginated());
    }
}
