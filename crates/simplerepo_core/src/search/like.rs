//! LIKE-based search strategy.

use crate::model::Model;
use crate::query::{ConditionBuilder, Operator, Query};

/// Adds one parenthesized group `f1 LIKE %text% OR f2 LIKE %text% ...`.
///
/// SQLite `LIKE` folds ASCII case only. `%`, `_` and `\` in `text` are escaped
/// so the text matches literally. With no fields the query is unchanged.
pub fn apply_like_search<M: Model>(query: Query<M>, fields: &[&str], text: &str) -> Query<M> {
    if fields.is_empty() {
        return query;
    }

    let pattern = format!("%{}%", escape_like(text));
    query.where_group(|group| {
        fields.iter().fold(group, |group, field| {
            group.or_where(field, Operator::Like, pattern.as_str())
        })
    })
}

fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{apply_like_search, escape_like};
    use crate::model::Model;
    use crate::query::{ConditionBuilder, Query};
    use rusqlite::types::Value as SqlValue;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Article {
        id: Option<i64>,
        title: String,
        body: String,
    }

    impl Model for Article {
        const TABLE: &'static str = "articles";

        fn columns() -> &'static [&'static str] {
            &["id", "title", "body"]
        }
    }

    #[test]
    fn escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
    }

    #[test]
    fn builds_one_or_group_across_fields() {
        let query = apply_like_search(
            Query::<Article>::new().where_eq("id", 1),
            &["title", "body"],
            "cat",
        );
        let (sql, binds) = query.to_sql().unwrap();

        assert_eq!(
            sql,
            "SELECT \"articles\".* FROM \"articles\" WHERE \"id\" = ? AND (\"title\" LIKE ? ESCAPE '\\' OR \"body\" LIKE ? ESCAPE '\\')"
        );
        assert_eq!(binds[1], SqlValue::Text("%cat%".to_string()));
        assert_eq!(binds[2], SqlValue::Text("%cat%".to_string()));
    }

    #[test]
    fn no_fields_leaves_query_unchanged() {
        let (sql, binds) = apply_like_search(Query::<Article>::new(), &[], "cat")
            .to_sql()
            .unwrap();
        assert_eq!(sql, "SELECT \"articles\".* FROM \"articles\"");
        assert!(binds.is_empty());
    }
}
