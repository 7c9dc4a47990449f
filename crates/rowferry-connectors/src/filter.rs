//! Filter configuration.
//!
//! Filters are conjunctive comparisons against column values. A
//! [`FilterBuilder`] holds two buckets: root filters, applied to every
//! collection, and per-collection filters, applied only to the named
//! collection. The SQL fragment helper is a convenience for SQL-speaking
//! drivers; nothing in the pipeline assumes SQL.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    /// Equal.
    #[default]
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Less than.
    Lt,
    /// Greater than or equal.
    Ge,
    /// Less than or equal.
    Le,
}

impl Operator {
    /// The wire spelling of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            other => Err(format!("unknown comparison operator: {other}")),
        }
    }
}

/// One conjunctive predicate: `column <op> literal`.
///
/// The literal is carried verbatim; drivers decide how to splice it into
/// their native query form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column to compare.
    pub column: String,
    /// Comparison operator.
    pub operator: Operator,
    /// Comparison literal, verbatim.
    pub value: String,
}

impl Filter {
    /// Creates a filter.
    #[must_use]
    pub fn new(column: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.column, self.operator, self.value)
    }
}

/// Accumulates root and per-collection filters.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    root: Vec<Filter>,
    per_collection: HashMap<String, Vec<Filter>>,
}

impl FilterBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root filter, applied to every collection.
    pub fn push_root(&mut self, filter: Filter) {
        self.root.push(filter);
    }

    /// Adds a filter applied only to `collection`.
    pub fn push(&mut self, collection: &str, filter: Filter) {
        self.per_collection
            .entry(collection.to_owned())
            .or_default()
            .push(filter);
    }

    /// The root filters.
    #[must_use]
    pub fn root(&self) -> &[Filter] {
        &self.root
    }

    /// The filters registered for `collection` (root excluded).
    #[must_use]
    pub fn for_collection(&self, collection: &str) -> &[Filter] {
        self.per_collection
            .get(collection)
            .map_or(&[], Vec::as_slice)
    }

    /// Every filter that applies to `collection`: root first, then
    /// per-collection.
    #[must_use]
    pub fn applicable(&self, collection: &str) -> Vec<&Filter> {
        self.root
            .iter()
            .chain(self.for_collection(collection))
            .collect()
    }

    /// Every filter in the builder.
    #[must_use]
    pub fn all(&self) -> Vec<&Filter> {
        self.root
            .iter()
            .chain(self.per_collection.values().flatten())
            .collect()
    }

    /// Drops the root filters.
    pub fn reset_root(&mut self) {
        self.root.clear();
    }

    /// Drops the filters registered for `collection`.
    pub fn reset_collection(&mut self, collection: &str) {
        self.per_collection.remove(collection);
    }

    /// Drops everything.
    pub fn reset(&mut self) {
        self.root.clear();
        self.per_collection.clear();
    }

    /// Reports whether no filter applies to `collection`.
    #[must_use]
    pub fn is_empty_for(&self, collection: &str) -> bool {
        self.root.is_empty() && self.for_collection(collection).is_empty()
    }

    /// Emits a ` WHERE …` fragment for `collection`, root predicates
    /// first, AND-joined. Returns the empty string when no filter
    /// applies. Literals are spliced verbatim.
    #[must_use]
    pub fn build_sql(&self, collection: &str) -> String {
        let filters = self.applicable(collection);
        if filters.is_empty() {
            return String::new();
        }
        let mut sql = String::from(" WHERE ");
        for (i, filter) in filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            sql.push_str(&filter.to_string());
        }
        sql
    }
}
