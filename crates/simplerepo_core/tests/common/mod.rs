#![allow(dead_code)]

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use simplerepo_core::model::into_attributes;
use simplerepo_core::{
    bool_from_int, open_db_in_memory, Attributes, Migration, Model, Relation, Searchable,
};

pub const MIGRATIONS: &[Migration] = &[
    Migration::new(
        1,
        "CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL
        );
        CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            uuid TEXT UNIQUE,
            user_id INTEGER REFERENCES users(id),
            title TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            status TEXT,
            published INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    ),
    Migration::new(
        2,
        "CREATE TABLE comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            body TEXT NOT NULL
        );",
    ),
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Option<i64>,
    pub name: String,
}

impl Model for User {
    const TABLE: &'static str = "users";

    fn columns() -> &'static [&'static str] {
        &["id", "name"]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: Option<i64>,
    pub post_id: i64,
    pub body: String,
}

impl Model for Comment {
    const TABLE: &'static str = "comments";

    fn columns() -> &'static [&'static str] {
        &["id", "post_id", "body"]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Option<i64>,
    pub uuid: Option<String>,
    pub user_id: Option<i64>,
    pub title: String,
    pub body: String,
    pub status: Option<String>,
    #[serde(deserialize_with = "bool_from_int")]
    pub published: bool,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub author: Option<User>,
}

impl Model for Post {
    const TABLE: &'static str = "posts";
    const TIMESTAMPS: bool = true;
    const AUTO_UUID: bool = true;

    fn columns() -> &'static [&'static str] {
        &[
            "id",
            "uuid",
            "user_id",
            "title",
            "body",
            "status",
            "published",
            "created_at",
            "updated_at",
        ]
    }

    fn fillable() -> &'static [&'static str] {
        &["uuid", "user_id", "title", "body", "status", "published"]
    }

    fn relations() -> &'static [Relation] {
        &[
            Relation::HasMany {
                name: "comments",
                table: "comments",
                foreign_key: "post_id",
            },
            Relation::BelongsTo {
                name: "author",
                table: "users",
                foreign_key: "user_id",
                owner_key: "id",
            },
        ]
    }
}

impl Searchable for Post {
    fn searchable_fields() -> &'static [&'static str] {
        &["title", "body"]
    }
}

pub fn setup_db() -> Connection {
    open_db_in_memory(MIGRATIONS).unwrap()
}

/// Builds an attribute set from a `json!` object literal.
pub fn attrs(value: Value) -> Attributes {
    into_attributes(value).expect("attribute literal must be an object")
}

pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })
    .unwrap()
}
