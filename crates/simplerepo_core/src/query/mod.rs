//! Composable, not-yet-executed retrieval requests.
//!
//! # Responsibility
//! - Build filtered/ordered queries for one [`Model`] without writing SQL.
//! - Compile to parameterized SQLite statements and hydrate typed records.
//!
//! # Invariants
//! - Identifiers are validated before interpolation; values are always bound.
//! - Executors borrow the query, so one query can run several times.
//! - `paginate`/`simple_paginate` replace any limit/offset set on the query.

mod clause;
mod ident;
mod page;
mod relation;
pub(crate) mod value;

use crate::db::DbError;
use crate::model::{from_attributes, Attributes, Model, ModelError};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use std::time::Instant;

pub use clause::{Boolean, ConditionBuilder, Conditions, Operator};
pub(crate) use clause::Clause;
pub(crate) use ident::quote_ident;
pub use page::{Page, SimplePage};

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("invalid SQL identifier `{0}`")]
    InvalidIdentifier(String),
    #[error("relation `{relation}` is not declared on `{table}`")]
    UnknownRelation {
        table: &'static str,
        relation: String,
    },
    #[error("page size must be greater than zero")]
    InvalidPageSize,
    /// Full-text expression rejected by the FTS5 parser.
    #[error("invalid full-text query: {message}")]
    InvalidSearch { message: String },
    #[error("{table} record not found with `{field}` of {value}")]
    NotFound {
        table: &'static str,
        field: String,
        value: String,
    },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for QueryError {
    fn from(value: rusqlite::Error) -> Self {
        if crate::search::fts::is_match_syntax_error(&value) {
            return Self::InvalidSearch {
                message: value.to_string(),
            };
        }
        Self::Db(DbError::Sqlite(value))
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query builder scoped to model `M`.
pub struct Query<M> {
    columns: Vec<String>,
    conditions: Conditions,
    orders: Vec<(String, Direction)>,
    relations: Vec<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    _model: PhantomData<fn() -> M>,
}

impl<M> Clone for Query<M> {
    fn clone(&self) -> Self {
        Self {
            columns: self.columns.clone(),
            conditions: self.conditions.clone(),
            orders: self.orders.clone(),
            relations: self.relations.clone(),
            limit: self.limit,
            offset: self.offset,
            _model: PhantomData,
        }
    }
}

impl<M> fmt::Debug for Query<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("columns", &self.columns)
            .field("conditions", &self.conditions)
            .field("orders", &self.orders)
            .field("relations", &self.relations)
            .field("limit", &self.limit)
            .field("offset", &self.offset)
            .finish()
    }
}

impl<M: Model> Default for Query<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ConditionBuilder for Query<M> {
    fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }
}

impl<M: Model> Query<M> {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            conditions: Conditions::new(),
            orders: Vec::new(),
            relations: Vec::new(),
            limit: None,
            offset: None,
            _model: PhantomData,
        }
    }

    /// Restricts selected columns. Empty or `["*"]` selects every column.
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns
            .iter()
            .filter(|column| **column != "*")
            .map(|column| column.to_string())
            .collect();
        self
    }

    pub fn order_by(self, column: &str) -> Self {
        self.order_by_dir(column, Direction::Asc)
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by_dir(column, Direction::Desc)
    }

    pub fn order_by_dir(mut self, column: &str, direction: Direction) -> Self {
        self.orders.push((column.to_string(), direction));
        self
    }

    /// Eager-loads a relation declared in [`Model::relations`].
    pub fn with(mut self, relation: &str) -> Self {
        if !self.relations.iter().any(|existing| existing == relation) {
            self.relations.push(relation.to_string());
        }
        self
    }

    pub fn with_all(self, relations: &[&str]) -> Self {
        relations
            .iter()
            .fold(self, |query, relation| query.with(relation))
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sets limit/offset for a 1-based page number.
    pub fn for_page(self, page: u32, per_page: u32) -> Self {
        let offset = page.max(1).saturating_sub(1).saturating_mul(per_page);
        self.offset(offset).limit(per_page)
    }

    pub(crate) fn push_clause(mut self, boolean: Boolean, clause: Clause) -> Self {
        self.conditions.push(boolean, clause);
        self
    }

    pub fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    pub fn relations(&self) -> &[String] {
        &self.relations
    }

    /// Compiles the SELECT statement and its bound values.
    pub fn to_sql(&self) -> QueryResult<(String, Vec<SqlValue>)> {
        let table = quote_ident(M::TABLE)?;
        let columns = if self.columns.is_empty() {
            format!("{table}.*")
        } else {
            self.columns
                .iter()
                .map(|column| quote_ident(column))
                .collect::<QueryResult<Vec<_>>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {table}");
        let mut binds = Vec::new();
        self.push_where(&table, &mut sql, &mut binds)?;

        if !self.orders.is_empty() {
            let orders = self
                .orders
                .iter()
                .map(|(column, direction)| {
                    quote_ident(column).map(|column| format!("{column} {}", direction.as_sql()))
                })
                .collect::<QueryResult<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(" LIMIT ?");
            binds.push(SqlValue::Integer(i64::from(limit)));
            if let Some(offset) = self.offset.filter(|offset| *offset > 0) {
                sql.push_str(" OFFSET ?");
                binds.push(SqlValue::Integer(i64::from(offset)));
            }
        } else if let Some(offset) = self.offset.filter(|offset| *offset > 0) {
            sql.push_str(" LIMIT -1 OFFSET ?");
            binds.push(SqlValue::Integer(i64::from(offset)));
        }

        Ok((sql, binds))
    }

    fn push_where(
        &self,
        table: &str,
        sql: &mut String,
        binds: &mut Vec<SqlValue>,
    ) -> QueryResult<()> {
        if self.conditions.is_empty() {
            return Ok(());
        }
        sql.push_str(" WHERE ");
        self.conditions.compile(table, sql, binds)
    }

    /// Runs the query and hydrates every row.
    pub fn get(&self, conn: &Connection) -> QueryResult<Vec<M>> {
        self.fetch_attributes(conn)?
            .into_iter()
            .map(|row| from_attributes(row).map_err(QueryError::from))
            .collect()
    }

    pub(crate) fn fetch_attributes(&self, conn: &Connection) -> QueryResult<Vec<Attributes>> {
        let started_at = Instant::now();
        let (sql, binds) = self.to_sql()?;
        let mut rows = value::read_rows(conn, &sql, &binds)?;
        relation::load_relations::<M>(conn, &mut rows, &self.relations)?;

        debug!(
            "event=query_get module=query status=ok table={} rows={} relations={} duration_ms={}",
            M::TABLE,
            rows.len(),
            self.relations.len(),
            started_at.elapsed().as_millis()
        );
        Ok(rows)
    }

    pub fn first(&self, conn: &Connection) -> QueryResult<Option<M>> {
        Ok(self.clone().limit(1).get(conn)?.into_iter().next())
    }

    /// Looks up one record by [`Model::PRIMARY_KEY`].
    pub fn find(&self, conn: &Connection, id: impl Into<Value>) -> QueryResult<Option<M>> {
        self.clone().where_eq(M::PRIMARY_KEY, id).first(conn)
    }

    pub fn find_or_fail(&self, conn: &Connection, id: impl Into<Value>) -> QueryResult<M> {
        let id = id.into();
        self.find(conn, id.clone())?
            .ok_or_else(|| QueryError::NotFound {
                table: M::TABLE,
                field: M::PRIMARY_KEY.to_string(),
                value: value::display_value(&id),
            })
    }

    /// Counts matching rows, ignoring ordering and limit/offset.
    pub fn count(&self, conn: &Connection) -> QueryResult<u64> {
        let table = quote_ident(M::TABLE)?;
        let mut sql = format!("SELECT COUNT(*) FROM {table}");
        let mut binds = Vec::new();
        self.push_where(&table, &mut sql, &mut binds)?;

        let count = conn.query_row(&sql, params_from_iter(binds.iter()), |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Length-aware page. `page` is 1-based; `0` reads as `1`.
    pub fn paginate(&self, conn: &Connection, per_page: u32, page: u32) -> QueryResult<Page<M>> {
        if per_page == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        let current_page = page.max(1);
        let total = self.count(conn)?;
        let items = if total == 0 {
            Vec::new()
        } else {
            self.clone().for_page(current_page, per_page).get(conn)?
        };

        Ok(Page {
            items,
            total,
            per_page,
            current_page,
        })
    }

    /// Page without a count query; fetches one extra row to detect more.
    pub fn simple_paginate(
        &self,
        conn: &Connection,
        per_page: u32,
        page: u32,
    ) -> QueryResult<SimplePage<M>> {
        if per_page == 0 {
            return Err(QueryError::InvalidPageSize);
        }
        let current_page = page.max(1);
        let offset = current_page.saturating_sub(1).saturating_mul(per_page);
        let mut items = self
            .clone()
            .offset(offset)
            .limit(per_page.saturating_add(1))
            .get(conn)?;

        let has_more = items.len() > per_page as usize;
        items.truncate(per_page as usize);

        Ok(SimplePage {
            items,
            per_page,
            current_page,
            has_more,
        })
    }

    /// Deletes every matching row; ordering and limit are ignored.
    pub fn delete(&self, conn: &Connection) -> QueryResult<usize> {
        let table = quote_ident(M::TABLE)?;
        let mut sql = format!("DELETE FROM {table}");
        let mut binds = Vec::new();
        self.push_where(&table, &mut sql, &mut binds)?;

        let deleted = conn.execute(&sql, params_from_iter(binds.iter()))?;
        debug!(
            "event=query_delete module=query status=ok table={} rows={deleted}",
            M::TABLE
        );
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConditionBuilder, Operator, Query, QueryError};
    use crate::model::Model;
    use rusqlite::types::Value as SqlValue;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Post {
        id: Option<i64>,
        title: String,
    }

    impl Model for Post {
        const TABLE: &'static str = "posts";

        fn columns() -> &'static [&'static str] {
            &["id", "title"]
        }
    }

    #[test]
    fn default_query_selects_everything() {
        let (sql, binds) = Query::<Post>::new().to_sql().unwrap();
        assert_eq!(sql, "SELECT \"posts\".* FROM \"posts\"");
        assert!(binds.is_empty());
    }

    #[test]
    fn compiles_columns_conditions_order_and_page() {
        let (sql, binds) = Query::<Post>::new()
            .select(&["id", "title"])
            .where_eq("title", "hello")
            .or_where("id", Operator::Gt, 10)
            .order_by_desc("id")
            .for_page(3, 20)
            .to_sql()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT \"id\", \"title\" FROM \"posts\" WHERE \"title\" = ? OR \"id\" > ? ORDER BY \"id\" DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            binds,
            vec![
                SqlValue::Text("hello".to_string()),
                SqlValue::Integer(10),
                SqlValue::Integer(20),
                SqlValue::Integer(40),
            ]
        );
    }

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let (sql, _) = Query::<Post>::new().offset(5).to_sql().unwrap();
        assert!(sql.ends_with("LIMIT -1 OFFSET ?"));
    }

    #[test]
    fn invalid_identifiers_fail_at_compile_time() {
        let err = Query::<Post>::new()
            .order_by("id; DROP TABLE posts")
            .to_sql()
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidIdentifier(_)));
    }

    #[test]
    fn star_select_is_the_default() {
        let (sql, _) = Query::<Post>::new().select(&["*"]).to_sql().unwrap();
        assert_eq!(sql, "SELECT \"posts\".* FROM \"posts\"");
    }

    #[test]
    fn with_deduplicates_relations() {
        let query = Query::<Post>::new().with("comments").with_all(&["comments", "author"]);
        assert_eq!(query.relations(), ["comments".to_string(), "author".to_string()]);
    }
}
