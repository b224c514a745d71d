//! Attribute-set conversions.

use super::{Model, ModelError};
use log::debug;
use serde_json::{Map, Value};

/// Unordered field-name to value mapping used for create/update input.
pub type Attributes = Map<String, Value>;

/// Converts a JSON object into an attribute set. Returns `None` for
/// non-object values.
pub fn into_attributes(value: Value) -> Option<Attributes> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Serializes a record into its attribute set.
pub fn to_attributes<M: Model>(model: &M) -> Result<Attributes, ModelError> {
    let value = serde_json::to_value(model).map_err(|source| ModelError::Serde {
        table: M::TABLE,
        source,
    })?;
    into_attributes(value).ok_or(ModelError::NotAnObject(M::TABLE))
}

/// Builds a record from an attribute set.
///
/// The set is laid over the attributes of `M::default()`, so keys missing
/// from a partial row (restricted `select`) keep their default values.
/// Unknown keys are ignored.
pub fn from_attributes<M: Model>(attributes: Attributes) -> Result<M, ModelError> {
    let mut merged = to_attributes(&M::default())?;
    merged.extend(attributes);
    serde_json::from_value(Value::Object(merged)).map_err(|source| ModelError::Serde {
        table: M::TABLE,
        source,
    })
}

/// Applies `attributes` onto `model`.
///
/// Keys outside [`Model::fillable`] are skipped. On error `model` is left
/// untouched.
pub fn fill<M: Model>(model: &mut M, attributes: &Attributes) -> Result<(), ModelError> {
    let mut current = to_attributes(model)?;
    let fillable = M::fillable();

    for (key, value) in attributes {
        if fillable.contains(&key.as_str()) {
            current.insert(key.clone(), value.clone());
        } else {
            debug!(
                "event=model_fill module=model status=skipped table={} key={key}",
                M::TABLE
            );
        }
    }

    *model = from_attributes(current)?;
    Ok(())
}

/// Reads one attribute from a record; absent keys read as null.
pub fn key_value<M: Model>(model: &M, key: &str) -> Result<Value, ModelError> {
    let attributes = to_attributes(model)?;
    Ok(attributes.get(key).cloned().unwrap_or(Value::Null))
}

/// `true` when `key` is present with a non-null value.
pub fn is_set(attributes: &Attributes, key: &str) -> bool {
    matches!(attributes.get(key), Some(value) if !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::{fill, from_attributes, into_attributes, is_set, key_value, Attributes};
    use crate::model::Model;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Account {
        id: Option<i64>,
        email: String,
        role: String,
    }

    impl Model for Account {
        const TABLE: &'static str = "accounts";

        fn columns() -> &'static [&'static str] {
            &["id", "email", "role"]
        }

        fn fillable() -> &'static [&'static str] {
            &["email"]
        }
    }

    fn attrs(value: serde_json::Value) -> Attributes {
        into_attributes(value).unwrap()
    }

    #[test]
    fn fill_respects_fillable_columns() {
        let mut account = Account {
            role: "member".to_string(),
            ..Account::default()
        };

        fill(
            &mut account,
            &attrs(json!({ "email": "a@example.com", "role": "admin", "unknown": 1 })),
        )
        .unwrap();

        assert_eq!(account.email, "a@example.com");
        assert_eq!(account.role, "member");
    }

    #[test]
    fn failed_fill_leaves_record_untouched() {
        let mut account = Account {
            email: "keep@example.com".to_string(),
            ..Account::default()
        };

        let err = fill(&mut account, &attrs(json!({ "email": 42 })));
        assert!(err.is_err());
        assert_eq!(account.email, "keep@example.com");
    }

    #[test]
    fn is_set_treats_null_as_missing() {
        let attributes = attrs(json!({ "id": null, "name": "x" }));
        assert!(!is_set(&attributes, "id"));
        assert!(is_set(&attributes, "name"));
        assert!(!is_set(&attributes, "uuid"));
    }

    #[test]
    fn key_value_reads_null_for_unset_key() {
        let account = Account::default();
        assert!(key_value(&account, "id").unwrap().is_null());
        assert!(key_value(&account, "missing").unwrap().is_null());
    }

    #[test]
    fn from_attributes_defaults_missing_keys() {
        let account: Account = from_attributes(attrs(json!({ "id": 3, "email": "e" }))).unwrap();
        assert_eq!(account.id, Some(3));
        assert_eq!(account.email, "e");
        assert_eq!(account.role, "");
    }
}
