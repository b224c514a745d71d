mod common;

use common::{attrs, setup_db, Post};
use serde_json::json;
use simplerepo_core::search::apply_like_search;
use simplerepo_core::{ConditionBuilder, Query, SearchFilter, SimpleRepository, SqliteRepository};

fn seed(repo: &SqliteRepository<'_, Post>) {
    for (title, body) in [
        ("Cat care", "feeding schedules"),
        ("Dogs", "the neighbour's CAT barks back"),
        ("Birds", "nothing relevant"),
        ("100% pure", "percent sign in title"),
        ("snake_case", "underscore in title"),
    ] {
        repo.create(&attrs(json!({ "title": title, "body": body }))).unwrap();
    }
}

fn titles(posts: &[Post]) -> Vec<&str> {
    posts.iter().map(|post| post.title.as_str()).collect()
}

#[test]
fn like_search_matches_any_field_case_insensitively() {
    let conn = setup_db();
    let repo = SqliteRepository::<Post>::new(&conn);
    seed(&repo);

    let found = repo.search("cat", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&found), ["Cat care", "Dogs"]);
}

#[test]
fn like_search_treats_wildcards_literally() {
    let conn = setup_db();
    let repo = SqliteRepository::<Post>::new(&conn);
    seed(&repo);

    let percent = repo.search("%", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&percent), ["100% pure"]);

    let underscore = repo.search("_", None).unwrap().get(&conn).unwrap();
    assert_eq!(titles(&underscore), ["snake_case"]);
}

#[test]
fn like_search_is_grouped_so_outer_conditions_still_apply() {
    let conn = setup_db();
    let repo = SqliteRepository::<Post>::new(&conn);
    seed(&repo);

    let base = repo.new_query(&[]).unwrap().where_eq("title", "Dogs");
    let filter = SearchFilter::with_query(base);
    let found = repo.search("cat", Some(&filter)).unwrap().get(&conn).unwrap();

    assert_eq!(titles(&found), ["Dogs"]);
}

#[test]
fn like_search_without_fields_leaves_query_unchanged() {
    let query = apply_like_search(Query::<Post>::new(), &[], "cat");
    assert!(query.conditions().is_empty());
}

#[test]
fn search_paginate_defaults_to_model_page_size() {
    let conn = setup_db();
    let repo = SqliteRepository::<Post>::new(&conn);
    for index in 0..20 {
        repo.create(&attrs(json!({ "title": format!("cat {index}") }))).unwrap();
    }

    let page = repo.search_paginate("cat", 1, None).unwrap();
    assert_eq!(page.per_page, 15);
    assert_eq!(page.total, 20);
    assert_eq!(page.items.len(), 15);

    let mut filter = SearchFilter::with_query(repo.new_query(&[]).unwrap());
    filter.set_per_page(4);
    let filtered = repo.search_paginate("cat", 2, Some(&filter)).unwrap();
    assert_eq!(filtered.per_page, 4);
    assert_eq!(filtered.items.len(), 4);
}
