//! Destination-side write planning.
//!
//! Before a destination driver issues its native bulk write it must
//! reshape each incoming row against the target schema: drop columns the
//! destination will fill from a default, materialise nulls for nullable
//! columns the source did not produce, reject rows missing a not-null
//! no-default column, and convert every present value to the target
//! column type. Rows that end up with different column sets are grouped
//! so each group can be written as one homogeneous bulk operation,
//! preserving default-value semantics on the destination.

use rowferry_core::{Batch, SchemaMap, Value};

use crate::error::ConnectorError;

/// One homogeneous group of converted rows sharing a column set.
#[derive(Debug)]
pub struct WriteGroup {
    /// Projected column names, in destination schema order.
    pub columns: Vec<String>,
    /// Converted values, one inner vector per row, aligned with
    /// `columns`.
    pub rows: Vec<Vec<Box<dyn Value>>>,
}

impl WriteGroup {
    /// Number of rows in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Reports whether the group has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Projects and converts `batch` against the destination `schema`.
///
/// For each destination column, in schema order:
/// - value present in the row: assert kind compatibility and convert to
///   the column type;
/// - value absent, column has a default: omit the column from this row's
///   projection;
/// - value absent, column nullable: emit a null of the column type;
/// - value absent otherwise: fail naming the column.
///
/// Row fields with no destination column are not projected. Groups come
/// back in first-appearance order; per-writer row order is preserved
/// within each group.
///
/// # Errors
///
/// [`ConnectorError::RequiredColumnMissing`] or a value conversion
/// error. On error nothing is returned, so no partial write can be
/// issued from the plan.
pub fn plan_batch(schema: &SchemaMap, batch: Batch) -> Result<Vec<WriteGroup>, ConnectorError> {
    let mut groups: Vec<WriteGroup> = Vec::new();

    for row in batch.iter() {
        let mut columns = Vec::new();
        let mut values: Vec<Box<dyn Value>> = Vec::new();

        for column in schema {
            match row.get(column.name()) {
                Some(value) => {
                    let converted = value.convert_to(column.type_info())?;
                    columns.push(column.name().to_owned());
                    values.push(converted);
                }
                None if column.has_default() => {}
                None if column.is_nullable() => {
                    columns.push(column.name().to_owned());
                    values.push(column.type_info().new_value());
                }
                None => {
                    return Err(ConnectorError::RequiredColumnMissing(
                        column.name().to_owned(),
                    ));
                }
            }
        }

        match groups.iter_mut().find(|g| g.columns == columns) {
            Some(group) => group.rows.push(values),
            None => groups.push(WriteGroup {
                columns,
                rows: vec![values],
            }),
        }
    }

    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowferry_core::types;
    use rowferry_core::{Datum, Row};

    fn dest_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);
        schema.insert("name", types::STRING, false, false);
        schema.insert("note", types::STRING, true, false);
        schema.insert("created_at", types::TIMESTAMP, false, true);
        schema
    }

    fn row(id: i64, name: &str, note: Option<&str>) -> Row {
        let mut r = Row::new();
        let mut idv = types::INT64.new_value();
        idv.parse(Datum::Int64(id)).unwrap();
        r.push("id", idv);
        let mut namev = types::STRING.new_value();
        namev.parse(Datum::Text(name.into())).unwrap();
        r.push("name", namev);
        if let Some(note) = note {
            let mut notev = types::STRING.new_value();
            notev.parse(Datum::Text(note.into())).unwrap();
            r.push("note", notev);
        }
        r
    }

    #[test]
    fn test_nullable_column_filled_with_null() {
        let mut batch = Batch::new();
        batch.add(row(1, "a", None));
        let groups = plan_batch(&dest_schema(), batch).unwrap();
        assert_eq!(groups.len(), 1);
        // created_at omitted (default), note present as null.
        assert_eq!(groups[0].columns, vec!["id", "name", "note"]);
        assert!(!groups[0].rows[0][2].has_value());
    }

    #[test]
    fn test_rows_grouped_by_column_set() {
        let mut batch = Batch::new();
        batch.add(row(1, "a", Some("x")));
        batch.add(row(2, "b", Some("y")));
        batch.add(row(3, "c", None));
        let schema = {
            // Make `note` defaulted so its absence changes the column set.
            let mut s = dest_schema();
            s.insert("note", types::STRING, true, true);
            s
        };
        let groups = plan_batch(&schema, batch).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].columns, vec!["id", "name", "note"]);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1].columns, vec!["id", "name"]);
        assert_eq!(groups[1].len(), 1);
    }

    #[test]
    fn test_missing_required_column_fails() {
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);
        schema.insert("must", types::STRING, false, false);

        let mut batch = Batch::new();
        batch.add(row(1, "a", None));
        let err = plan_batch(&schema, batch).unwrap_err();
        assert!(
            matches!(err, ConnectorError::RequiredColumnMissing(col) if col == "must"),
            "unexpected error"
        );
    }

    #[test]
    fn test_values_converted_to_target_types() {
        // Incoming int32-shaped value lands in an int64 destination column.
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);

        let mut r = Row::new();
        let mut v = types::INT64.new_value();
        v.parse(Datum::Int32(7)).unwrap();
        r.push("id", v);
        let mut batch = Batch::new();
        batch.add(r);

        let groups = plan_batch(&schema, batch).unwrap();
        assert_eq!(groups[0].rows[0][0].get(), Some(Datum::Int64(7)));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);

        let mut r = Row::new();
        let mut v = types::STRING.new_value();
        v.parse(Datum::Text("abc".into())).unwrap();
        r.push("id", v);
        let mut batch = Batch::new();
        batch.add(r);

        assert!(matches!(
            plan_batch(&schema, batch).unwrap_err(),
            ConnectorError::Value(_)
        ));
    }
}
