//! Batches.
//!
//! A [`Batch`] is the FIFO unit of transfer between a driver read and
//! the buffer, and between the buffer and a driver write. It also knows
//! how to render itself as RFC 4180 CSV for diagnostics.

use std::collections::VecDeque;
use std::fmt;
use std::fmt::Write as _;

use crate::row::Row;

/// An ordered sequence of rows.
#[derive(Clone, Default)]
pub struct Batch {
    rows: VecDeque<Row>,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row. Empty rows are skipped.
    pub fn add(&mut self, row: Row) {
        if !row.is_empty() {
            self.rows.push_back(row);
        }
    }

    /// Appends every row from `rows`, skipping empty ones.
    pub fn add_all(&mut self, rows: impl IntoIterator<Item = Row>) {
        for row in rows {
            self.add(row);
        }
    }

    /// Removes and returns the front row.
    pub fn pop(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Returns the row at `index` without removing it.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reports whether the batch holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Removes all rows.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Approximate byte footprint: the sum of row sizes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.rows.iter().map(Row::size).sum()
    }

    /// Iterates rows front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.rows.iter()
    }

    /// Consumes the batch, yielding rows front to back.
    pub fn into_rows(self) -> impl Iterator<Item = Row> {
        self.rows.into_iter()
    }

    /// Renders the batch as RFC 4180 CSV, header row first.
    ///
    /// The header is taken from the first row's keys. Null values render
    /// as empty fields. Used for diagnostics only.
    #[must_use]
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let Some(first) = self.rows.front() else {
            return out;
        };
        for (i, key) in first.keys().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_csv_field(&mut out, key);
        }
        out.push('\n');
        for row in &self.rows {
            for (i, field) in row.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                let rendered = field
                    .value()
                    .get()
                    .map(|d| d.to_string())
                    .unwrap_or_default();
                push_csv_field(&mut out, &rendered);
            }
            out.push('\n');
        }
        out
    }
}

fn push_csv_field(out: &mut String, field: &str) {
    if field.contains([',', '"', '\n', '\r']) {
        out.push('"');
        for ch in field.chars() {
            if ch == '"' {
                out.push('"');
            }
            out.push(ch);
        }
        out.push('"');
    } else {
        out.push_str(field);
    }
}

impl FromIterator<Row> for Batch {
    fn from_iter<I: IntoIterator<Item = Row>>(iter: I) -> Self {
        let mut batch = Batch::new();
        batch.add_all(iter);
        batch
    }
}

impl fmt::Debug for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Batch(")?;
        let mut sep = "";
        for row in &self.rows {
            f.write_str(sep)?;
            write!(f, "{row:?}")?;
            sep = ", ";
        }
        f.write_char(')')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::Datum;
    use crate::types;

    fn row(id: i64, name: &str) -> Row {
        let mut r = Row::new();
        let mut idv = types::INT64.new_value();
        idv.parse(Datum::Int64(id)).unwrap();
        r.push("id", idv);
        let mut namev = types::STRING.new_value();
        namev.parse(Datum::Text(name.into())).unwrap();
        r.push("name", namev);
        r
    }

    #[test]
    fn test_fifo_order() {
        let mut b = Batch::new();
        b.add(row(1, "a"));
        b.add(row(2, "b"));
        assert_eq!(b.len(), 2);
        let first = b.pop().unwrap();
        assert_eq!(first.get("id").unwrap().get(), Some(Datum::Int64(1)));
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_empty_rows_skipped() {
        let mut b = Batch::new();
        b.add(Row::new());
        assert!(b.is_empty());
        assert_eq!(b.pop().map(|_| ()), None);
    }

    #[test]
    fn test_size_and_clear() {
        let mut b = Batch::new();
        b.add(row(1, "a"));
        assert!(b.size() > 0);
        b.clear();
        assert_eq!(b.size(), 0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut b = Batch::new();
        b.add(row(1, "a"));
        let copy = b.clone();
        b.pop();
        assert_eq!(copy.len(), 1);
    }

    #[test]
    fn test_csv_rendering() {
        let mut b = Batch::new();
        b.add(row(1, "plain"));
        b.add(row(2, "with,comma"));
        b.add(row(3, "with\"quote"));
        let csv = b.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "id,name");
        assert_eq!(lines[1], "1,plain");
        assert_eq!(lines[2], "2,\"with,comma\"");
        assert_eq!(lines[3], "3,\"with\"\"quote\"");
    }

    #[test]
    fn test_csv_empty_batch() {
        assert_eq!(Batch::new().to_csv(), "");
    }
}
