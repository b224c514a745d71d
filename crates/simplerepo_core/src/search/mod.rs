//! Text search capability and request-scoped search filter.
//!
//! # Responsibility
//! - Declare which models can be searched and how ([`Searchable`]).
//! - Provide the LIKE fallback strategy and the FTS5 full-text binding.
//! - Decorate queries with search text, default ordering and page settings.
//!
//! # Invariants
//! - Search text is always passed explicitly; nothing reads ambient state.

pub mod filter;
pub mod fts;
pub mod like;

use crate::model::Model;
use crate::query::Query;

pub use filter::{Filterable, SearchFilter};
pub use fts::FullTextIndex;
pub use like::apply_like_search;

/// A model that supports text search.
///
/// The default strategy matches `text` as a case-insensitive substring of any
/// field in [`Searchable::searchable_fields`]. Models backed by a
/// [`FullTextIndex`] override [`Searchable::apply_text_search`].
pub trait Searchable: Model {
    /// Columns considered by the LIKE strategy.
    fn searchable_fields() -> &'static [&'static str] {
        &[]
    }

    /// Narrows `query` to records matching `text`.
    fn apply_text_search(query: Query<Self>, text: &str) -> Query<Self> {
        apply_like_search(query, Self::searchable_fields(), text)
    }
}
