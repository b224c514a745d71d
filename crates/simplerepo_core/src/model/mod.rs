//! Record types and attribute-set handling.
//!
//! # Responsibility
//! - Describe how a Rust type maps onto one table ([`Model`]).
//! - Convert records to and from attribute sets through `serde`.
//! - Persist records (`insert`, `update`, `save`, `destroy`).
//!
//! # Invariants
//! - A model serializes to a JSON object whose keys are column names.
//! - Only [`Model::columns`] are ever written; other keys (eager-loaded
//!   relations, computed fields) are ignored by persistence.

pub mod attributes;
pub mod persist;
mod relation;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub use attributes::{
    fill, from_attributes, into_attributes, is_set, key_value, to_attributes, Attributes,
};
pub use relation::Relation;

/// Column maintained on insert when [`Model::TIMESTAMPS`] is enabled.
pub const CREATED_AT: &str = "created_at";
/// Column maintained on insert and update when [`Model::TIMESTAMPS`] is enabled.
pub const UPDATED_AT: &str = "updated_at";
/// Secondary unique identifier column.
pub const UUID: &str = "uuid";

/// A persisted record type bound to one table.
///
/// Implementors are plain serde structs. Hydration goes through a JSON object
/// keyed by column name, so field names must match column names (use
/// `#[serde(rename)]` otherwise).
pub trait Model: Serialize + DeserializeOwned + Default {
    /// Table backing this model.
    const TABLE: &'static str;
    /// Primary key column. Auto-increment integer keys should be `Option<i64>`.
    const PRIMARY_KEY: &'static str = "id";
    /// Maintain `created_at`/`updated_at` as epoch milliseconds.
    const TIMESTAMPS: bool = false;
    /// Generate a v4 `uuid` on insert when the attribute is null.
    const AUTO_UUID: bool = false;
    /// Default page size for searches without an explicit filter.
    const PER_PAGE: u32 = 15;

    /// Persisted columns, primary key included.
    fn columns() -> &'static [&'static str];

    /// Columns [`fill`] may assign. Defaults to every column.
    fn fillable() -> &'static [&'static str] {
        Self::columns()
    }

    /// Relations available for eager loading.
    fn relations() -> &'static [Relation] {
        &[]
    }
}

/// Errors raised while converting between records and attribute sets.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model `{0}` must serialize to a JSON object")]
    NotAnObject(&'static str),
    #[error("failed to convert `{table}` attributes: {source}")]
    Serde {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Deserializes a boolean stored as SQLite integer (`0`/`1`) or JSON bool.
///
/// Use with `#[serde(deserialize_with = "bool_from_int")]`.
pub fn bool_from_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Stored {
        Bool(bool),
        Int(i64),
    }

    match Stored::deserialize(deserializer)? {
        Stored::Bool(value) => Ok(value),
        Stored::Int(value) => Ok(value != 0),
    }
}

#[cfg(test)]
mod tests {
    use super::bool_from_int;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Flag {
        #[serde(deserialize_with = "bool_from_int")]
        on: bool,
    }

    #[test]
    fn bool_from_int_accepts_integers_and_bools() {
        let from_int: Flag = serde_json::from_value(json!({ "on": 1 })).unwrap();
        assert!(from_int.on);

        let from_zero: Flag = serde_json::from_value(json!({ "on": 0 })).unwrap();
        assert!(!from_zero.on);

        let from_bool: Flag = serde_json::from_value(json!({ "on": true })).unwrap();
        assert!(from_bool.on);
    }
}
