//! Eager loading of declared relations.

use super::ident::quote_ident;
use super::value::{read_rows, to_sql_value};
use super::{QueryError, QueryResult};
use crate::model::{Attributes, Model, Relation};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Keeps `IN (...)` lists well below SQLite's bound-parameter limit.
const KEY_CHUNK: usize = 500;

/// Loads each named relation and injects it into the parent rows.
///
/// Unknown names fail even when `rows` is empty.
pub(crate) fn load_relations<M: Model>(
    conn: &Connection,
    rows: &mut [Attributes],
    names: &[String],
) -> QueryResult<()> {
    for requested in names {
        let relation = M::relations()
            .iter()
            .find(|relation| relation.name() == requested.as_str())
            .ok_or_else(|| QueryError::UnknownRelation {
                table: M::TABLE,
                relation: requested.clone(),
            })?;

        if rows.is_empty() {
            continue;
        }

        match *relation {
            Relation::HasMany {
                name,
                table,
                foreign_key,
            } => {
                let grouped =
                    fetch_grouped(conn, table, foreign_key, &collect_keys(rows, M::PRIMARY_KEY))?;
                for row in rows.iter_mut() {
                    let related = lookup_key(row, M::PRIMARY_KEY)
                        .and_then(|key| grouped.get(&key))
                        .cloned()
                        .unwrap_or_default();
                    row.insert(
                        name.to_string(),
                        Value::Array(related.into_iter().map(Value::Object).collect()),
                    );
                }
            }
            Relation::HasOne {
                name,
                table,
                foreign_key,
            } => {
                let grouped =
                    fetch_grouped(conn, table, foreign_key, &collect_keys(rows, M::PRIMARY_KEY))?;
                for row in rows.iter_mut() {
                    let related = lookup_key(row, M::PRIMARY_KEY)
                        .and_then(|key| grouped.get(&key))
                        .and_then(|related| related.first().cloned());
                    row.insert(name.to_string(), related.map_or(Value::Null, Value::Object));
                }
            }
            Relation::BelongsTo {
                name,
                table,
                foreign_key,
                owner_key,
            } => {
                let grouped =
                    fetch_grouped(conn, table, owner_key, &collect_keys(rows, foreign_key))?;
                for row in rows.iter_mut() {
                    let related = lookup_key(row, foreign_key)
                        .and_then(|key| grouped.get(&key))
                        .and_then(|related| related.first().cloned());
                    row.insert(name.to_string(), related.map_or(Value::Null, Value::Object));
                }
            }
        }
    }

    Ok(())
}

fn lookup_key(row: &Attributes, column: &str) -> Option<String> {
    match row.get(column) {
        Some(value) if !value.is_null() => Some(value.to_string()),
        _ => None,
    }
}

fn collect_keys(rows: &[Attributes], column: &str) -> Vec<Value> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null() && seen.insert(value.to_string()))
        .cloned()
        .collect()
}

fn fetch_grouped(
    conn: &Connection,
    table: &str,
    column: &str,
    keys: &[Value],
) -> QueryResult<HashMap<String, Vec<Attributes>>> {
    let mut grouped: HashMap<String, Vec<Attributes>> = HashMap::new();
    if keys.is_empty() {
        return Ok(grouped);
    }

    let quoted_table = quote_ident(table)?;
    let quoted_column = quote_ident(column)?;

    for chunk in keys.chunks(KEY_CHUNK) {
        let placeholders = vec!["?"; chunk.len()].join(", ");
        let sql = format!(
            "SELECT * FROM {quoted_table} WHERE {quoted_column} IN ({placeholders}) ORDER BY {quoted_table}.rowid"
        );
        let binds = chunk.iter().map(to_sql_value).collect::<Vec<SqlValue>>();

        for row in read_rows(conn, &sql, &binds)? {
            if let Some(key) = lookup_key(&row, column) {
                grouped.entry(key).or_default().push(row);
            }
        }
    }

    Ok(grouped)
}
