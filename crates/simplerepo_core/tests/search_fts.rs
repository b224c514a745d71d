mod common;

use serde::{Deserialize, Serialize};
use serde_json::json;
use simplerepo_core::{
    open_db_in_memory, FullTextIndex, Migration, Model, Query, QueryError, Searchable,
    SimpleRepository, SqliteRepository,
};

const DOCS_FTS: FullTextIndex = FullTextIndex::new("docs", "docs_fts", &["title", "content"]);

const MIGRATIONS: &[Migration] = &[Migration::new(
    1,
    "CREATE TABLE docs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        content TEXT NOT NULL DEFAULT ''
    );",
)];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Doc {
    id: Option<i64>,
    title: String,
    content: String,
}

impl Model for Doc {
    const TABLE: &'static str = "docs";

    fn columns() -> &'static [&'static str] {
        &["id", "title", "content"]
    }
}

impl Searchable for Doc {
    fn apply_text_search(query: Query<Self>, text: &str) -> Query<Self> {
        DOCS_FTS.apply(query, text)
    }
}

fn setup() -> rusqlite::Connection {
    let conn = open_db_in_memory(MIGRATIONS).unwrap();
    DOCS_FTS.install(&conn).unwrap();
    conn
}

fn create(repo: &SqliteRepository<'_, Doc>, title: &str, content: &str) -> Doc {
    repo.create(&common::attrs(json!({ "title": title, "content": content }))).unwrap()
}

fn titles(docs: &[Doc]) -> Vec<&str> {
    docs.iter().map(|doc| doc.title.as_str()).collect()
}

#[test]
fn full_text_search_requires_every_term() {
    let conn = setup();
    let repo = SqliteRepository::<Doc>::new(&conn);
    create(&repo, "Rust notes", "ownership and borrowing");
    create(&repo, "Go notes", "goroutines");
    create(&repo, "Rust tips", "cargo workspaces");

    let found = repo.search("rust notes", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&found), ["Rust notes"]);

    let by_content = repo.search("cargo", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&by_content), ["Rust tips"]);
}

#[test]
fn triggers_keep_index_in_sync_with_updates_and_deletes() {
    let conn = setup();
    let repo = SqliteRepository::<Doc>::new(&conn);
    let doc = create(&repo, "draft", "alpha");

    repo.update(doc.clone(), &common::attrs(json!({ "content": "omega" }))).unwrap();
    assert!(repo.search("alpha", None).unwrap().get(&conn).unwrap().is_empty());
    assert_eq!(repo.search("omega", None).unwrap().count(&conn).unwrap(), 1);

    repo.delete([doc.id.unwrap()]).unwrap();
    assert_eq!(repo.search("omega", None).unwrap().count(&conn).unwrap(), 0);
}

#[test]
fn install_indexes_existing_rows() {
    let conn = open_db_in_memory(MIGRATIONS).unwrap();
    conn.execute(
        "INSERT INTO docs (title, content) VALUES ('legacy', 'imported before index')",
        [],
    )
    .unwrap();

    DOCS_FTS.install(&conn).unwrap();
    DOCS_FTS.install(&conn).unwrap();

    let repo = SqliteRepository::<Doc>::new(&conn);
    let found = repo.search("imported", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&found), ["legacy"]);
}

#[test]
fn operator_characters_in_plain_text_do_not_break_matching() {
    let conn = setup();
    let repo = SqliteRepository::<Doc>::new(&conn);
    create(&repo, "quote\"d", "c++ AND (parens)");

    let found = repo.search("c++ (parens", None).unwrap().get(&conn).unwrap();
    assert_eq!(found.len(), 1);
    assert!(repo.search("   ", None).unwrap().conditions().is_empty());
}

#[test]
fn raw_expression_errors_surface_as_invalid_search() {
    let conn = setup();
    let repo = SqliteRepository::<Doc>::new(&conn);
    create(&repo, "one", "two");

    let query = DOCS_FTS.apply_raw(repo.new_query(&[]).unwrap(), "one AND (");
    assert!(matches!(query.get(&conn), Err(QueryError::InvalidSearch { .. })));

    let page = repo.search_paginate("two", 1, None).unwrap();
    assert_eq!(page.total, 1);
}
