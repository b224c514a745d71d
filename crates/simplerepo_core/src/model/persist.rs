//! Record persistence.
//!
//! # Invariants
//! - Only [`Model::columns`] are written.
//! - A null primary key is omitted on insert so SQLite assigns one.
//! - After a write the record is reloaded, so database defaults and
//!   generated keys are visible to the caller.

use super::{is_set, key_value, to_attributes, Model, CREATED_AT, UPDATED_AT, UUID};
use crate::query::value::{display_value, to_sql_value};
use crate::query::{quote_ident, ConditionBuilder, Query, QueryError, QueryResult};
use log::debug;
use rusqlite::{params_from_iter, Connection};
use serde_json::Value;
use uuid::Uuid;

const NOW_EPOCH_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

/// Inserts `model` as a new row and reloads it.
pub fn insert<M: Model>(conn: &Connection, model: &mut M) -> QueryResult<()> {
    let mut attributes = to_attributes(model)?;
    if M::AUTO_UUID && M::columns().contains(&UUID) && !is_set(&attributes, UUID) {
        attributes.insert(UUID.to_string(), Value::String(Uuid::new_v4().to_string()));
    }

    let table = quote_ident(M::TABLE)?;
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut binds = Vec::new();

    for &column in M::columns() {
        if is_timestamp::<M>(column) {
            columns.push(quote_ident(column)?);
            placeholders.push(NOW_EPOCH_MS_SQL);
            continue;
        }

        let value = attributes.get(column).cloned().unwrap_or(Value::Null);
        if column == M::PRIMARY_KEY && value.is_null() {
            continue;
        }

        columns.push(quote_ident(column)?);
        placeholders.push("?");
        binds.push(to_sql_value(&value));
    }

    let sql = if columns.is_empty() {
        format!("INSERT INTO {table} DEFAULT VALUES")
    } else {
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        )
    };
    conn.execute(&sql, params_from_iter(binds.iter()))?;

    let (field, key) = if is_set(&attributes, M::PRIMARY_KEY) {
        (M::PRIMARY_KEY, attributes[M::PRIMARY_KEY].clone())
    } else {
        ("rowid", Value::from(conn.last_insert_rowid()))
    };
    *model = reload::<M>(conn, field, key)?;

    debug!("event=model_insert module=model status=ok table={}", M::TABLE);
    Ok(())
}

/// Updates the row identified by the model's primary key.
///
/// Returns `false` when the key is null or no row matched.
pub fn update<M: Model>(conn: &Connection, model: &mut M) -> QueryResult<bool> {
    let key = key_value(model, M::PRIMARY_KEY)?;
    if key.is_null() {
        return Ok(false);
    }
    update_by_key(conn, model, &key)
}

/// Updates the row whose primary key is `key`, writing every column of
/// `model` including a changed primary key, then reloads it.
///
/// Returns `false` when no row matched `key`.
pub fn update_by_key<M: Model>(
    conn: &Connection,
    model: &mut M,
    key: &Value,
) -> QueryResult<bool> {
    let attributes = to_attributes(model)?;
    let new_key = attributes
        .get(M::PRIMARY_KEY)
        .filter(|value| !value.is_null())
        .cloned()
        .unwrap_or_else(|| key.clone());

    let table = quote_ident(M::TABLE)?;
    let primary_key = quote_ident(M::PRIMARY_KEY)?;
    let mut assignments = Vec::new();
    let mut binds = Vec::new();

    if new_key != *key {
        assignments.push(format!("{primary_key} = ?"));
        binds.push(to_sql_value(&new_key));
    }

    for &column in M::columns() {
        if column == M::PRIMARY_KEY || (M::TIMESTAMPS && column == CREATED_AT) {
            continue;
        }
        if is_timestamp::<M>(column) {
            assignments.push(format!("{} = {NOW_EPOCH_MS_SQL}", quote_ident(column)?));
            continue;
        }

        let value = attributes.get(column).cloned().unwrap_or(Value::Null);
        assignments.push(format!("{} = ?", quote_ident(column)?));
        binds.push(to_sql_value(&value));
    }

    if assignments.is_empty() {
        assignments.push(format!("{primary_key} = {primary_key}"));
    }
    binds.push(to_sql_value(key));

    let sql = format!(
        "UPDATE {table} SET {} WHERE {primary_key} = ?",
        assignments.join(", ")
    );
    let changed = conn.execute(&sql, params_from_iter(binds.iter()))?;
    if changed == 0 {
        return Ok(false);
    }

    *model = reload::<M>(conn, M::PRIMARY_KEY, new_key)?;
    debug!("event=model_update module=model status=ok table={}", M::TABLE);
    Ok(true)
}

/// Updates the existing row, or inserts when there is none.
///
/// A record whose key is set but whose row no longer exists is inserted
/// again under the same key.
pub fn save<M: Model>(conn: &Connection, model: &mut M) -> QueryResult<()> {
    if update(conn, model)? {
        return Ok(());
    }
    insert(conn, model)
}

/// Deletes rows by primary key and returns how many were removed.
pub fn destroy<M: Model>(conn: &Connection, ids: &[Value]) -> QueryResult<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    Query::<M>::new()
        .where_in(M::PRIMARY_KEY, ids.iter().cloned())
        .delete(conn)
}

fn is_timestamp<M: Model>(column: &str) -> bool {
    M::TIMESTAMPS && (column == CREATED_AT || column == UPDATED_AT)
}

fn reload<M: Model>(conn: &Connection, field: &str, key: Value) -> QueryResult<M> {
    let value = display_value(&key);
    Query::<M>::new()
        .where_eq(field, key)
        .first(conn)?
        .ok_or_else(|| QueryError::NotFound {
            table: M::TABLE,
            field: field.to_string(),
            value,
        })
}
