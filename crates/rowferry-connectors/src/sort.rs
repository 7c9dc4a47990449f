//! Sort configuration.
//!
//! Mirrors the filter builder: a root bucket applied to every collection
//! and a per-collection bucket, with a SQL fragment helper for drivers
//! that speak SQL.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Direction {
    /// The SQL spelling of the direction.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(format!("unknown sort direction: {s}"))
        }
    }
}

/// One ordering term: `column [asc|desc]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Column to order by.
    pub column: String,
    /// Direction.
    pub direction: Direction,
}

impl Sort {
    /// Creates a sort term.
    #[must_use]
    pub fn new(column: impl Into<String>, direction: Direction) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction)
    }
}

/// Accumulates root and per-collection sort terms.
#[derive(Debug, Clone, Default)]
pub struct SortBuilder {
    root: Vec<Sort>,
    per_collection: HashMap<String, Vec<Sort>>,
}

impl SortBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a root sort term, applied to every collection.
    pub fn push_root(&mut self, sort: Sort) {
        self.root.push(sort);
    }

    /// Adds a sort term applied only to `collection`.
    pub fn push(&mut self, collection: &str, sort: Sort) {
        self.per_collection
            .entry(collection.to_owned())
            .or_default()
            .push(sort);
    }

    /// The root sort terms.
    #[must_use]
    pub fn root(&self) -> &[Sort] {
        &self.root
    }

    /// The sort terms registered for `collection` (root excluded).
    #[must_use]
    pub fn for_collection(&self, collection: &str) -> &[Sort] {
        self.per_collection
            .get(collection)
            .map_or(&[], Vec::as_slice)
    }

    /// Every sort term that applies to `collection`: root first, then
    /// per-collection.
    #[must_use]
    pub fn applicable(&self, collection: &str) -> Vec<&Sort> {
        self.root
            .iter()
            .chain(self.for_collection(collection))
            .collect()
    }

    /// Every sort term in the builder.
    #[must_use]
    pub fn all(&self) -> Vec<&Sort> {
        self.root
            .iter()
            .chain(self.per_collection.values().flatten())
            .collect()
    }

    /// Drops the root terms.
    pub fn reset_root(&mut self) {
        self.root.clear();
    }

    /// Drops the terms registered for `collection`.
    pub fn reset_collection(&mut self, collection: &str) {
        self.per_collection.remove(collection);
    }

    /// Drops everything.
    pub fn reset(&mut self) {
        self.root.clear();
        self.per_collection.clear();
    }

    /// Emits an ` ORDER BY …` fragment for `collection`, root terms
    /// first, comma-joined. Returns the empty string when no term
    /// applies.
    #[must_use]
    pub fn build_sql(&self, collection: &str) -> String {
        let sorts = self.applicable(collection);
        if sorts.is_empty() {
            return String::new();
        }
        let mut sql = String::from(" ORDER BY ");
        for (i, sort) in sorts.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&sort.to_string());
        }
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_parse_case_insensitive() {
        assert_eq!("asc".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("up".parse::<Direction>().is_err());
    }

    #[test]
    fn test_build_sql() {
        let mut b = SortBuilder::new();
        b.push_root(Sort::new("created_at", Direction::Desc));
        b.push("users", Sort::new("id", Direction::Asc));
        assert_eq!(
            b.build_sql("users"),
            " ORDER BY created_at DESC, id ASC"
        );
        assert_eq!(b.build_sql("orders"), " ORDER BY created_at DESC");
        b.reset();
        assert_eq!(b.build_sql("users"), "");
    }
}
