//! Ordered schema maps.
//!
//! A [`SchemaMap`] records, for one collection, the mapping from column
//! name to driver-exported type together with nullability and
//! default-presence flags. Column order is declaration order on the
//! source and is the canonical projection order everywhere downstream.

use std::fmt;

use crate::value::TypeInfo;

/// One column entry in a schema map.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    type_info: TypeInfo,
    nullable: bool,
    has_default: bool,
}

impl Column {
    /// The column name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The column's type descriptor.
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Whether the column accepts nulls.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Whether the column carries a default value on the engine side.
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.has_default
    }
}

/// Insertion-ordered mapping of column name to type and flags.
///
/// Names are unique: setting an existing name updates it in place
/// without disturbing the order, and removing a name compacts the index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaMap {
    columns: Vec<Column>,
}

impl SchemaMap {
    /// Creates an empty schema map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a column's type, appending the column if it is new and
    /// preserving existing flags otherwise.
    pub fn set(&mut self, name: &str, type_info: TypeInfo) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == name) {
            col.type_info = type_info;
        } else {
            self.columns.push(Column {
                name: name.to_owned(),
                type_info,
                nullable: false,
                has_default: false,
            });
        }
    }

    /// Sets a column's type together with its flags, appending if new.
    pub fn insert(&mut self, name: &str, type_info: TypeInfo, nullable: bool, has_default: bool) {
        if let Some(col) = self.columns.iter_mut().find(|c| c.name == name) {
            col.type_info = type_info;
            col.nullable = nullable;
            col.has_default = has_default;
        } else {
            self.columns.push(Column {
                name: name.to_owned(),
                type_info,
                nullable,
                has_default,
            });
        }
    }

    /// Returns the type of a column by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<TypeInfo> {
        self.column(name).map(Column::type_info)
    }

    /// Returns the type of the column at `index` in declaration order.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<TypeInfo> {
        self.columns.get(index).map(Column::type_info)
    }

    /// Returns the full column entry by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Reports whether a column exists.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Removes a column, compacting the order. Unknown names are a
    /// no-op.
    pub fn remove(&mut self, name: &str) {
        self.columns.retain(|c| c.name != name);
    }

    /// Column names in declaration order.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Names of columns that do not accept nulls.
    #[must_use]
    pub fn not_nullable_keys(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !c.nullable)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Column names in declaration order, skipping `except`.
    #[must_use]
    pub fn keys_except(&self, except: &[&str]) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| !except.contains(&c.name.as_str()))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Iterates columns in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Reports whether the map has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<'a> IntoIterator for &'a SchemaMap {
    type Item = &'a Column;
    type IntoIter = std::slice::Iter<'a, Column>;

    fn into_iter(self) -> Self::IntoIter {
        self.columns.iter()
    }
}

impl fmt::Display for SchemaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for col in &self.columns {
            if !first {
                f.write_str(", ")?;
            }
            first = false;
            write!(f, "{} {}", col.name, col.type_info.name())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types;

    fn sample() -> SchemaMap {
        let mut m = SchemaMap::new();
        m.insert("id", types::INT64, false, false);
        m.insert("name", types::STRING, false, true);
        m.insert("note", types::STRING, true, false);
        m
    }

    #[test]
    fn test_declaration_order_preserved() {
        let m = sample();
        assert_eq!(m.keys(), vec!["id", "name", "note"]);
        assert_eq!(m.get_by_index(0), Some(types::INT64));
        assert_eq!(m.get_by_index(2), Some(types::STRING));
        assert_eq!(m.get_by_index(3), None);
    }

    #[test]
    fn test_set_updates_in_place() {
        let mut m = sample();
        m.set("id", types::STRING);
        assert_eq!(m.keys(), vec!["id", "name", "note"]);
        assert_eq!(m.get("id"), Some(types::STRING));
        // Flags survive a type update.
        assert!(!m.column("id").unwrap().is_nullable());
    }

    #[test]
    fn test_remove_compacts_index() {
        let mut m = sample();
        m.remove("name");
        assert_eq!(m.keys(), vec!["id", "note"]);
        assert_eq!(m.get_by_index(1), Some(types::STRING));
        assert_eq!(m.len(), 2);
        m.remove("absent");
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn test_derived_views() {
        let m = sample();
        assert_eq!(m.not_nullable_keys(), vec!["id", "name"]);
        assert_eq!(m.keys_except(&["name"]), vec!["id", "note"]);
    }
}
