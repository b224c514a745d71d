//! Identifier validation and quoting.

use super::{QueryError, QueryResult};
use once_cell::sync::Lazy;
use regex::Regex;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Quotes `column` or `table.column` after validating each part.
///
/// Identifiers are interpolated into SQL text, so anything outside
/// `[A-Za-z_][A-Za-z0-9_]*` is rejected instead of escaped.
pub(crate) fn quote_ident(name: &str) -> QueryResult<String> {
    let parts = name.split('.').collect::<Vec<_>>();
    if parts.len() > 2 || parts.iter().any(|part| !IDENT_RE.is_match(part)) {
        return Err(QueryError::InvalidIdentifier(name.to_string()));
    }

    Ok(parts
        .iter()
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}

#[cfg(test)]
mod tests {
    use super::quote_ident;
    use crate::query::QueryError;

    #[test]
    fn quotes_plain_and_qualified_names() {
        assert_eq!(quote_ident("title").unwrap(), "\"title\"");
        assert_eq!(quote_ident("posts.title").unwrap(), "\"posts\".\"title\"");
    }

    #[test]
    fn rejects_injection_attempts() {
        for bad in ["", "title; DROP TABLE posts", "a\"b", "a.b.c", "1abc", "title "] {
            assert!(
                matches!(quote_ident(bad), Err(QueryError::InvalidIdentifier(_))),
                "`{bad}` should be rejected"
            );
        }
    }
}
