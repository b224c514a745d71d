//! Repository facade over the query builder.
//!
//! # Responsibility
//! - Offer uniform CRUD/find/search operations for one model type.
//! - Keep SQL details out of application call sites.
//!
//! # Invariants
//! - Lookups return `None` for absent records; `find_or_fail` and
//!   `update_by_id` are the only operations that fail with `NotFound`.
//! - Every operation first checks the model's table is present on the
//!   connection (`Prerequisite`).

pub mod repository;

pub use repository::{RepoError, RepoResult, SimpleRepository, SqliteRepository};
