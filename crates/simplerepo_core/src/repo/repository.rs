//! Generic repository contract and SQLite implementation.

use crate::db::DbError;
use crate::model::{fill, is_set, key_value, persist, Attributes, Model, ModelError};
use crate::query::value::display_value;
use crate::query::{ConditionBuilder, Page, Query, QueryError, SimplePage};
use crate::search::{Filterable, Searchable};
use log::debug;
use rusqlite::Connection;
use serde_json::Value;
use std::cell::Cell;
use std::collections::HashSet;
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// The repository or filter is not usable yet (missing table, unset query).
    #[error("prerequisite not met: {0}")]
    Prerequisite(String),
    #[error("{table} record not found with `{field}` of {value}")]
    NotFound {
        table: &'static str,
        field: String,
        value: String,
    },
    #[error("key `{0}` not found in attributes")]
    MissingKey(String),
    #[error(transparent)]
    Query(QueryError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<QueryError> for RepoError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::NotFound {
                table,
                field,
                value,
            } => Self::NotFound {
                table,
                field,
                value,
            },
            other => Self::Query(other),
        }
    }
}

impl From<ModelError> for RepoError {
    fn from(value: ModelError) -> Self {
        Self::Query(QueryError::Model(value))
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::from(QueryError::from(value))
    }
}

/// CRUD/search contract bound to one model type.
///
/// `id_field`/`where_key` arguments default to the repository primary key
/// when `None` (or empty).
pub trait SimpleRepository<M: Model> {
    fn new_model(&self) -> RepoResult<M>;
    fn new_query(&self, columns: &[&str]) -> RepoResult<Query<M>>;

    fn all(&self, relations: &[&str]) -> RepoResult<Vec<M>>;
    fn paginate(
        &self,
        per_page: u32,
        page: u32,
        relations: &[&str],
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<Page<M>>;
    fn simple_paginate(
        &self,
        per_page: u32,
        page: u32,
        relations: &[&str],
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<SimplePage<M>>;
    fn search(&self, text: &str, filter: Option<&dyn Filterable<M>>) -> RepoResult<Query<M>>
    where
        M: Searchable;
    fn search_paginate(
        &self,
        text: &str,
        page: u32,
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<Page<M>>
    where
        M: Searchable;

    fn find(&self, id: impl Into<Value>, relations: &[&str]) -> RepoResult<Option<M>>;
    fn find_by_uuid(&self, uuid: &str, relations: &[&str]) -> RepoResult<Option<M>>;
    fn find_by_field(
        &self,
        field: &str,
        value: impl Into<Value>,
        relations: &[&str],
    ) -> RepoResult<Option<M>>;
    fn find_or_create(&self, attributes: Attributes, id_field: Option<&str>) -> RepoResult<M>;
    fn find_or_fail(&self, id: impl Into<Value>) -> RepoResult<M>;
    fn find_by_attribute(
        &self,
        attributes: &Attributes,
        where_value: impl Into<Value>,
        where_key: Option<&str>,
    ) -> RepoResult<Option<M>>;

    fn create(&self, attributes: &Attributes) -> RepoResult<M>;

    fn update_or_insert(&self, attributes: Attributes, id_field: Option<&str>) -> RepoResult<M>;
    fn update_or_insert_by_uuid(&self, attributes: Attributes) -> RepoResult<M>;

    fn update(&self, record: M, attributes: &Attributes) -> RepoResult<M>;
    fn update_by_id(
        &self,
        attributes: Attributes,
        id: impl Into<Value>,
        id_field: Option<&str>,
    ) -> RepoResult<M>;
    /// Updates the row under the record's key, or inserts it. A key whose row
    /// was deleted is inserted again under that key.
    fn save(&self, record: &mut M) -> RepoResult<()>;

    fn delete<I>(&self, ids: I) -> RepoResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>;
    fn delete_where(&self, conditions: &Attributes) -> RepoResult<usize>;
}

/// SQLite-backed repository for model `M`.
pub struct SqliteRepository<'conn, M> {
    conn: &'conn Connection,
    primary_key: String,
    schema_checked: Cell<bool>,
    _model: PhantomData<fn() -> M>,
}

impl<'conn, M: Model> SqliteRepository<'conn, M> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            primary_key: M::PRIMARY_KEY.to_string(),
            schema_checked: Cell::new(false),
            _model: PhantomData,
        }
    }

    /// Like [`SqliteRepository::new`], checking the model table up front.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let repo = Self::new(conn);
        repo.validate_prerequisites()?;
        Ok(repo)
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Overrides the key used when `id_field`/`where_key` is omitted.
    pub fn set_primary_key(&mut self, primary_key: impl Into<String>) -> &mut Self {
        self.primary_key = primary_key.into();
        self
    }

    fn resolve_key<'a>(&'a self, key: Option<&'a str>) -> &'a str {
        key.filter(|key| !key.is_empty())
            .unwrap_or(self.primary_key.as_str())
    }

    fn validate_prerequisites(&self) -> RepoResult<()> {
        if self.schema_checked.get() {
            return Ok(());
        }
        ensure_model_table::<M>(self.conn)?;
        self.schema_checked.set(true);
        Ok(())
    }

    fn base_query(
        &self,
        relations: &[&str],
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<Query<M>> {
        let query = match filter {
            Some(filter) => {
                self.validate_prerequisites()?;
                filter.query()?.clone()
            }
            None => self.new_query(&[])?,
        };
        Ok(query.with_all(relations))
    }
}

impl<M: Model> SimpleRepository<M> for SqliteRepository<'_, M> {
    fn new_model(&self) -> RepoResult<M> {
        self.validate_prerequisites()?;
        Ok(M::default())
    }

    fn new_query(&self, columns: &[&str]) -> RepoResult<Query<M>> {
        self.validate_prerequisites()?;
        Ok(Query::new().select(columns))
    }

    fn all(&self, relations: &[&str]) -> RepoResult<Vec<M>> {
        Ok(self.new_query(&[])?.with_all(relations).get(self.conn)?)
    }

    fn paginate(
        &self,
        per_page: u32,
        page: u32,
        relations: &[&str],
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<Page<M>> {
        let query = self.base_query(relations, filter)?;
        match filter {
            Some(filter) if !filter.is_paginated() => Ok(Page::single(query.get(self.conn)?)),
            Some(filter) => Ok(query.paginate(self.conn, filter.per_page(), page)?),
            None => Ok(query.paginate(self.conn, per_page, page)?),
        }
    }

    fn simple_paginate(
        &self,
        per_page: u32,
        page: u32,
        relations: &[&str],
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<SimplePage<M>> {
        let query = self.base_query(relations, filter)?;
        match filter {
            Some(filter) if !filter.is_paginated() => {
                Ok(SimplePage::single(query.get(self.conn)?))
            }
            Some(filter) => Ok(query.simple_paginate(self.conn, filter.per_page(), page)?),
            None => Ok(query.simple_paginate(self.conn, per_page, page)?),
        }
    }

    fn search(&self, text: &str, filter: Option<&dyn Filterable<M>>) -> RepoResult<Query<M>>
    where
        M: Searchable,
    {
        let query = self.base_query(&[], filter)?;
        debug!(
            "event=repo_search module=repo status=ok table={} filtered={}",
            M::TABLE,
            filter.is_some()
        );
        Ok(M::apply_text_search(query, text))
    }

    fn search_paginate(
        &self,
        text: &str,
        page: u32,
        filter: Option<&dyn Filterable<M>>,
    ) -> RepoResult<Page<M>>
    where
        M: Searchable,
    {
        let per_page = filter.map_or(M::PER_PAGE, |filter| filter.per_page());
        let query = self.search(text, filter)?;
        Ok(query.paginate(self.conn, per_page, page)?)
    }

    fn find(&self, id: impl Into<Value>, relations: &[&str]) -> RepoResult<Option<M>> {
        Ok(self
            .new_query(&[])?
            .with_all(relations)
            .find(self.conn, id)?)
    }

    fn find_by_uuid(&self, uuid: &str, relations: &[&str]) -> RepoResult<Option<M>> {
        self.find_by_field(crate::model::UUID, uuid, relations)
    }

    fn find_by_field(
        &self,
        field: &str,
        value: impl Into<Value>,
        relations: &[&str],
    ) -> RepoResult<Option<M>> {
        Ok(self
            .new_query(&[])?
            .with_all(relations)
            .where_eq(field, value)
            .first(self.conn)?)
    }

    fn find_or_create(&self, attributes: Attributes, id_field: Option<&str>) -> RepoResult<M> {
        let id_field = self.resolve_key(id_field);

        if is_set(&attributes, id_field) {
            if let Some(record) = self.find_by_field(id_field, attributes[id_field].clone(), &[])? {
                return Ok(record);
            }
        }

        self.create(&attributes)
    }

    fn find_or_fail(&self, id: impl Into<Value>) -> RepoResult<M> {
        Ok(self.new_query(&[])?.find_or_fail(self.conn, id)?)
    }

    fn find_by_attribute(
        &self,
        attributes: &Attributes,
        where_value: impl Into<Value>,
        where_key: Option<&str>,
    ) -> RepoResult<Option<M>> {
        let where_key = self.resolve_key(where_key);
        if validate_attributes_have_key(attributes, where_key).is_err() {
            return Ok(None);
        }

        match attributes.get(where_key).and_then(Value::as_str) {
            Some(field) => self.find_by_field(field, where_value, &[]),
            None => Ok(None),
        }
    }

    fn create(&self, attributes: &Attributes) -> RepoResult<M> {
        let mut record = self.new_model()?;
        fill(&mut record, attributes)?;
        persist::insert(self.conn, &mut record)?;

        debug!("event=repo_create module=repo status=ok table={}", M::TABLE);
        Ok(record)
    }

    fn update_or_insert(
        &self,
        mut attributes: Attributes,
        id_field: Option<&str>,
    ) -> RepoResult<M> {
        let id_field = self.resolve_key(id_field);

        if is_set(&attributes, id_field) {
            if let Some(record) = self.find_by_field(id_field, attributes[id_field].clone(), &[])? {
                attributes.remove(id_field);
                return self.update(record, &attributes);
            }
        }

        self.create(&attributes)
    }

    fn update_or_insert_by_uuid(&self, attributes: Attributes) -> RepoResult<M> {
        self.update_or_insert(attributes, Some(crate::model::UUID))
    }

    /// Writes against the key `record` carried before `attributes` were
    /// applied, so a changed primary key renames the row. A record without a
    /// key is inserted.
    fn update(&self, record: M, attributes: &Attributes) -> RepoResult<M> {
        self.validate_prerequisites()?;
        let original_key = key_value(&record, M::PRIMARY_KEY)?;
        let mut record = record;
        fill(&mut record, attributes)?;

        if original_key.is_null() {
            persist::insert(self.conn, &mut record)?;
        } else if !persist::update_by_key(self.conn, &mut record, &original_key)? {
            return Err(RepoError::NotFound {
                table: M::TABLE,
                field: M::PRIMARY_KEY.to_string(),
                value: display_value(&original_key),
            });
        }

        debug!("event=repo_update module=repo status=ok table={}", M::TABLE);
        Ok(record)
    }

    /// Requires `id_field` in `attributes` but looks the record up by the
    /// separate `id` argument; `update_or_insert` looks up by the attribute.
    fn update_by_id(
        &self,
        mut attributes: Attributes,
        id: impl Into<Value>,
        id_field: Option<&str>,
    ) -> RepoResult<M> {
        let id_field = self.resolve_key(id_field);
        validate_attributes_have_key(&attributes, id_field)?;

        let id = id.into();
        let record = self
            .find_by_field(id_field, id.clone(), &[])?
            .ok_or_else(|| RepoError::NotFound {
                table: M::TABLE,
                field: id_field.to_string(),
                value: display_value(&id),
            })?;

        attributes.remove(id_field);
        self.update(record, &attributes)
    }

    fn save(&self, record: &mut M) -> RepoResult<()> {
        self.validate_prerequisites()?;
        persist::save(self.conn, record)?;
        Ok(())
    }

    fn delete<I>(&self, ids: I) -> RepoResult<usize>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        self.validate_prerequisites()?;
        let ids = ids.into_iter().map(Into::into).collect::<Vec<Value>>();
        let deleted = persist::destroy::<M>(self.conn, &ids)?;

        debug!(
            "event=repo_delete module=repo status=ok table={} requested={} deleted={deleted}",
            M::TABLE,
            ids.len()
        );
        Ok(deleted)
    }

    /// An empty condition set matches, and deletes, every row.
    fn delete_where(&self, conditions: &Attributes) -> RepoResult<usize> {
        Ok(self
            .new_query(&[])?
            .where_all(conditions)
            .delete(self.conn)?)
    }
}

fn validate_attributes_have_key(attributes: &Attributes, key: &str) -> RepoResult<()> {
    if !is_set(attributes, key) {
        return Err(RepoError::MissingKey(key.to_string()));
    }
    Ok(())
}

fn ensure_model_table<M: Model>(conn: &Connection) -> RepoResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1);")?;
    let columns = stmt
        .query_map([M::TABLE], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;

    if columns.is_empty() {
        return Err(RepoError::Prerequisite(format!(
            "table `{}` is not present on this connection; apply migrations before using the repository",
            M::TABLE
        )));
    }

    if let Some(missing) = M::columns()
        .iter()
        .find(|column| !columns.contains(**column))
    {
        return Err(RepoError::Prerequisite(format!(
            "table `{}` is missing column `{missing}`",
            M::TABLE
        )));
    }

    Ok(())
}
