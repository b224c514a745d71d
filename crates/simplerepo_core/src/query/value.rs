//! Conversions between attribute values and SQLite values.

use super::QueryResult;
use crate::model::Attributes;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde_json::{Map, Number, Value};

/// Maps an attribute value onto a bindable SQLite value.
///
/// Booleans become `0`/`1`; arrays and objects are stored as JSON text.
pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                SqlValue::Integer(int)
            } else {
                SqlValue::Real(number.as_f64().unwrap_or_default())
            }
        }
        Value::String(text) => SqlValue::Text(text.clone()),
        Value::Array(_) | Value::Object(_) => SqlValue::Text(value.to_string()),
    }
}

/// Maps a column value read from SQLite onto an attribute value.
pub(crate) fn to_json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(int) => Value::from(int),
        ValueRef::Real(real) => Number::from_f64(real).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => {
            Value::Array(bytes.iter().map(|byte| Value::from(*byte)).collect())
        }
    }
}

/// Renders a key value for error messages.
pub(crate) fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Runs `sql` and returns every row as an attribute set keyed by column name.
pub(crate) fn read_rows(
    conn: &Connection,
    sql: &str,
    binds: &[SqlValue],
) -> QueryResult<Vec<Attributes>> {
    let mut stmt = conn.prepare(sql)?;
    let names = stmt
        .column_names()
        .into_iter()
        .map(str::to_string)
        .collect::<Vec<_>>();

    let mut rows = stmt.query(params_from_iter(binds.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut attributes = Map::with_capacity(names.len());
        for (index, name) in names.iter().enumerate() {
            attributes.insert(name.clone(), to_json_value(row.get_ref(index)?));
        }
        out.push(attributes);
    }

    Ok(out)
}
