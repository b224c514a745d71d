//! SQLite FTS5 full-text binding.
//!
//! # Responsibility
//! - Describe an external-content FTS5 index kept in sync by triggers.
//! - Turn user text into a safe `MATCH` expression and apply it to a query.
//!
//! # Invariants
//! - The index shares rowids with its source table.
//! - Plain text is tokenized on whitespace and each term is quoted, so
//!   type-as-you-search input never hits FTS5 syntax errors.

use crate::model::Model;
use crate::query::{quote_ident, Boolean, Clause, Query, QueryResult};
use log::info;
use rusqlite::Connection;

/// External-content FTS5 index over columns of one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullTextIndex {
    pub source_table: &'static str,
    pub index_table: &'static str,
    pub columns: &'static [&'static str],
}

impl FullTextIndex {
    pub const fn new(
        source_table: &'static str,
        index_table: &'static str,
        columns: &'static [&'static str],
    ) -> Self {
        Self {
            source_table,
            index_table,
            columns,
        }
    }

    /// DDL for the virtual table and its insert/delete/update triggers.
    pub fn schema_sql(&self) -> QueryResult<String> {
        let source = quote_ident(self.source_table)?;
        let index = quote_ident(self.index_table)?;
        let columns = self
            .columns
            .iter()
            .map(|column| quote_ident(column))
            .collect::<QueryResult<Vec<_>>>()?;
        let column_list = columns.join(", ");
        let new_values = prefixed(&columns, "new");
        let old_values = prefixed(&columns, "old");
        let trigger = |suffix: &str| quote_ident(&format!("{}_{suffix}", self.index_table));
        let (after_insert, after_delete, after_update) =
            (trigger("ai")?, trigger("ad")?, trigger("au")?);

        Ok(format!(
            "CREATE VIRTUAL TABLE IF NOT EXISTS {index} USING fts5({column_list}, content='{source_name}');
CREATE TRIGGER IF NOT EXISTS {after_insert} AFTER INSERT ON {source} BEGIN
    INSERT INTO {index}(rowid, {column_list}) VALUES (new.rowid, {new_values});
END;
CREATE TRIGGER IF NOT EXISTS {after_delete} AFTER DELETE ON {source} BEGIN
    INSERT INTO {index}({index}, rowid, {column_list}) VALUES ('delete', old.rowid, {old_values});
END;
CREATE TRIGGER IF NOT EXISTS {after_update} AFTER UPDATE ON {source} BEGIN
    INSERT INTO {index}({index}, rowid, {column_list}) VALUES ('delete', old.rowid, {old_values});
    INSERT INTO {index}(rowid, {column_list}) VALUES (new.rowid, {new_values});
END;",
            source_name = self.source_table,
        ))
    }

    /// Creates the index if missing and rebuilds it from the source table.
    pub fn install(&self, conn: &Connection) -> QueryResult<()> {
        conn.execute_batch(&self.schema_sql()?)?;
        self.rebuild(conn)?;
        info!(
            "event=fts_install module=search status=ok table={} index={}",
            self.source_table, self.index_table
        );
        Ok(())
    }

    /// Re-reads every source row into the index.
    pub fn rebuild(&self, conn: &Connection) -> QueryResult<()> {
        let index = quote_ident(self.index_table)?;
        conn.execute_batch(&format!("INSERT INTO {index}({index}) VALUES ('rebuild');"))?;
        Ok(())
    }

    /// Restricts `query` to rows whose indexed columns contain every term of
    /// `text`. Blank text leaves the query unchanged.
    pub fn apply<M: Model>(&self, query: Query<M>, text: &str) -> Query<M> {
        match build_match_expression(text, false) {
            Some(expression) => self.push_match(query, expression),
            None => query,
        }
    }

    /// Like [`FullTextIndex::apply`] but passes `expression` through as raw
    /// FTS5 syntax. Parse errors surface as `QueryError::InvalidSearch` when
    /// the query runs.
    pub fn apply_raw<M: Model>(&self, query: Query<M>, expression: &str) -> Query<M> {
        match build_match_expression(expression, true) {
            Some(expression) => self.push_match(query, expression),
            None => query,
        }
    }

    fn push_match<M: Model>(&self, query: Query<M>, expression: String) -> Query<M> {
        query.push_clause(
            Boolean::And,
            Clause::FullText {
                index_table: self.index_table.to_string(),
                expression,
            },
        )
    }
}

fn prefixed(columns: &[String], row: &str) -> String {
    columns
        .iter()
        .map(|column| format!("{row}.{column}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn build_match_expression(text: &str, raw: bool) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if raw {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(escape_fts_term)
        .collect::<Vec<_>>();

    if terms.is_empty() {
        return None;
    }

    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    format!("\"{escaped}\"")
}

pub(crate) fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
