//! Relation declarations used for eager loading.

/// Link between a model and rows of another table.
///
/// Eager-loaded rows are injected into the parent's attribute set under
/// `name` before deserialization: an array for `HasMany`, an object or null
/// for `HasOne` and `BelongsTo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `table.foreign_key` references the parent primary key.
    HasMany {
        name: &'static str,
        table: &'static str,
        foreign_key: &'static str,
    },
    /// Like `HasMany`, keeping only the first related row.
    HasOne {
        name: &'static str,
        table: &'static str,
        foreign_key: &'static str,
    },
    /// The parent's `foreign_key` references `table.owner_key`.
    BelongsTo {
        name: &'static str,
        table: &'static str,
        foreign_key: &'static str,
        owner_key: &'static str,
    },
}

impl Relation {
    /// Name used in `with(...)` and as the injected attribute key.
    pub const fn name(&self) -> &'static str {
        match *self {
            Self::HasMany { name, .. }
            | Self::HasOne { name, .. }
            | Self::BelongsTo { name, .. } => name,
        }
    }

    /// Related table.
    pub const fn table(&self) -> &'static str {
        match *self {
            Self::HasMany { table, .. }
            | Self::HasOne { table, .. }
            | Self::BelongsTo { table, .. } => table,
        }
    }
}
