//! WHERE clause building blocks.

use super::ident::quote_ident;
use super::value::to_sql_value;
use super::QueryResult;
use crate::model::Attributes;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Comparison operator for a single column condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// `LIKE` with `\` as escape character.
    Like,
    NotLike,
}

impl Operator {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
        }
    }
}

/// How a condition joins the one before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boolean {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Clause {
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    Null {
        column: String,
        negated: bool,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
    Group(Conditions),
    /// Restricts the table's rowid to FTS5 matches in `index_table`.
    FullText {
        index_table: String,
        expression: String,
    },
}

impl Clause {
    fn is_empty(&self) -> bool {
        matches!(self, Self::Group(inner) if inner.is_empty())
    }

    fn compile(&self, table: &str, sql: &mut String, binds: &mut Vec<SqlValue>) -> QueryResult<()> {
        match self {
            Self::Compare { column, op, value } => {
                let column = quote_ident(column)?;
                match (op, value.is_null()) {
                    (Operator::Eq, true) => sql.push_str(&format!("{column} IS NULL")),
                    (Operator::NotEq, true) => sql.push_str(&format!("{column} IS NOT NULL")),
                    (Operator::Like | Operator::NotLike, _) => {
                        sql.push_str(&format!("{column} {} ? ESCAPE '\\'", op.as_sql()));
                        binds.push(to_sql_value(value));
                    }
                    _ => {
                        sql.push_str(&format!("{column} {} ?", op.as_sql()));
                        binds.push(to_sql_value(value));
                    }
                }
            }
            Self::Null { column, negated } => {
                let column = quote_ident(column)?;
                let check = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{column} {check}"));
            }
            Self::In { column, values } => {
                if values.is_empty() {
                    sql.push_str("0 = 1");
                } else {
                    let column = quote_ident(column)?;
                    let placeholders = vec!["?"; values.len()].join(", ");
                    sql.push_str(&format!("{column} IN ({placeholders})"));
                    binds.extend(values.iter().map(to_sql_value));
                }
            }
            Self::Group(inner) => {
                sql.push('(');
                inner.compile(table, sql, binds)?;
                sql.push(')');
            }
            Self::FullText {
                index_table,
                expression,
            } => {
                let index = quote_ident(index_table)?;
                sql.push_str(&format!(
                    "{table}.rowid IN (SELECT rowid FROM {index} WHERE {index} MATCH ?)"
                ));
                binds.push(SqlValue::Text(expression.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Condition {
    boolean: Boolean,
    clause: Clause,
}

/// Ordered list of conditions; the top-level WHERE of a query or a nested
/// parenthesized group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    items: Vec<Condition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when compiling would produce no SQL (empty groups count as
    /// nothing).
    pub fn is_empty(&self) -> bool {
        self.items.iter().all(|condition| condition.clause.is_empty())
    }

    pub(crate) fn push(&mut self, boolean: Boolean, clause: Clause) {
        self.items.push(Condition { boolean, clause });
    }

    pub(crate) fn compile(
        &self,
        table: &str,
        sql: &mut String,
        binds: &mut Vec<SqlValue>,
    ) -> QueryResult<()> {
        let mut first = true;
        for condition in self.items.iter().filter(|item| !item.clause.is_empty()) {
            if !first {
                sql.push_str(match condition.boolean {
                    Boolean::And => " AND ",
                    Boolean::Or => " OR ",
                });
            }
            first = false;
            condition.clause.compile(table, sql, binds)?;
        }
        Ok(())
    }
}

/// Chainable WHERE builders shared by [`Query`](super::Query) and nested
/// [`Conditions`] groups.
pub trait ConditionBuilder: Sized {
    #[doc(hidden)]
    fn conditions_mut(&mut self) -> &mut Conditions;

    fn where_op(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions_mut().push(
            Boolean::And,
            Clause::Compare {
                column: column.to_string(),
                op,
                value: value.into(),
            },
        );
        self
    }

    fn or_where(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions_mut().push(
            Boolean::Or,
            Clause::Compare {
                column: column.to_string(),
                op,
                value: value.into(),
            },
        );
        self
    }

    /// Equality; a null value compiles to `IS NULL`.
    fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    fn or_where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.or_where(column, Operator::Eq, value)
    }

    /// AND-ed equality for every entry of `attributes`.
    fn where_all(self, attributes: &Attributes) -> Self {
        attributes
            .iter()
            .fold(self, |builder, (column, value)| builder.where_eq(column, value.clone()))
    }

    fn where_null(mut self, column: &str) -> Self {
        self.conditions_mut().push(
            Boolean::And,
            Clause::Null {
                column: column.to_string(),
                negated: false,
            },
        );
        self
    }

    fn where_not_null(mut self, column: &str) -> Self {
        self.conditions_mut().push(
            Boolean::And,
            Clause::Null {
                column: column.to_string(),
                negated: true,
            },
        );
        self
    }

    /// Membership test; an empty list matches nothing.
    fn where_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.conditions_mut().push(
            Boolean::And,
            Clause::In {
                column: column.to_string(),
                values: values.into_iter().map(Into::into).collect(),
            },
        );
        self
    }

    /// AND-ed parenthesized group. An empty group is dropped.
    fn where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        let group = build(Conditions::new());
        self.conditions_mut().push(Boolean::And, Clause::Group(group));
        self
    }

    fn or_where_group(mut self, build: impl FnOnce(Conditions) -> Conditions) -> Self {
        let group = build(Conditions::new());
        self.conditions_mut().push(Boolean::Or, Clause::Group(group));
        self
    }
}

impl ConditionBuilder for Conditions {
    fn conditions_mut(&mut self) -> &mut Conditions {
        self
    }
}
