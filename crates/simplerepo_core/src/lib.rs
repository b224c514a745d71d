//! Generic repository layer over SQLite.
//!
//! A [`SqliteRepository`] binds one [`Model`] type to a connection and offers
//! CRUD, lookup, pagination and text search. [`SearchFilter`] carries a
//! request's base query and page settings into listing calls.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod search;

pub use db::{
    open_db, open_db_in_memory, open_db_with_options, DbError, DbOptions, DbResult, Migration,
};
pub use logging::{default_log_level, init_logging, logging_status, LogOptions, LoggingError};
pub use model::{bool_from_int, Attributes, Model, ModelError, Relation};
pub use query::{
    ConditionBuilder, Conditions, Direction, Operator, Page, Query, QueryError, QueryResult,
    SimplePage,
};
pub use repo::{RepoError, RepoResult, SimpleRepository, SqliteRepository};
pub use search::{FullTextIndex, Filterable, SearchFilter, Searchable};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
