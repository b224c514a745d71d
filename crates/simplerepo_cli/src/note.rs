//! Demo `notes` model used by the CLI.

use serde::{Deserialize, Serialize};
use simplerepo_core::{FullTextIndex, Migration, Model, Query, Searchable};

pub const NOTES_FTS: FullTextIndex = FullTextIndex::new("notes", "notes_fts", &["title", "body"]);

pub const MIGRATIONS: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        uuid TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        body TEXT NOT NULL DEFAULT '',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );",
)];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Note {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub title: String,
    pub body: String,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

impl Model for Note {
    const TABLE: &'static str = "notes";
    const TIMESTAMPS: bool = true;
    const AUTO_UUID: bool = true;

    fn columns() -> &'static [&'static str] {
        &["id", "uuid", "title", "body", "created_at", "updated_at"]
    }

    fn fillable() -> &'static [&'static str] {
        &["uuid", "title", "body"]
    }
}

impl Searchable for Note {
    fn searchable_fields() -> &'static [&'static str] {
        &["title", "body"]
    }

    fn apply_text_search(query: Query<Self>, text: &str) -> Query<Self> {
        NOTES_FTS.apply(query, text)
    }
}
