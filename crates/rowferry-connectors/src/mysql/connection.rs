//! MySQL connection.

use async_trait::async_trait;
use chrono::NaiveDate;
use mysql_async::prelude::Queryable;

use rowferry_core::{Batch, Datum, Row, SchemaMap};

use super::config::MySqlConfig;
use super::types;
use crate::driver::{
    Connection, DataCollectionDetail, DatabaseDetail, FilterableConnection, ReadableConnection,
    SortableConnection,
};
use crate::error::ConnectorError;
use crate::filter::FilterBuilder;
use crate::sort::SortBuilder;

/// A readable, filterable, sortable MySQL connection.
pub struct MySqlConnection {
    conn: Option<mysql_async::Conn>,
    config: MySqlConfig,
    filters: FilterBuilder,
    sorts: SortBuilder,
}

impl MySqlConnection {
    pub(super) fn new(conn: mysql_async::Conn, config: MySqlConfig) -> Self {
        Self {
            conn: Some(conn),
            config,
            filters: FilterBuilder::new(),
            sorts: SortBuilder::new(),
        }
    }

    fn conn(&mut self) -> Result<&mut mysql_async::Conn, ConnectorError> {
        self.conn.as_mut().ok_or(ConnectorError::ConnectionIsClosed)
    }
}

#[async_trait]
impl Connection for MySqlConnection {
    async fn close(&mut self) -> Result<(), ConnectorError> {
        if let Some(conn) = self.conn.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.conn.is_none()
    }

    async fn ping(&mut self) -> Result<(), ConnectorError> {
        self.conn()?.ping().await?;
        Ok(())
    }

    async fn get_details(&mut self) -> Result<DatabaseDetail, ConnectorError> {
        let filters = self.filters.clone();
        let database = self.config.database.clone();
        let conn = self.conn()?;

        let tables: Vec<String> = conn.query("SHOW TABLES").await?;
        let mut collections = Vec::with_capacity(tables.len());

        for table in tables {
            let mut schema = SchemaMap::new();
            let columns: Vec<mysql_async::Row> =
                conn.query(format!("SHOW COLUMNS FROM `{table}`")).await?;
            for column in columns {
                let field: String = column
                    .get(0)
                    .ok_or_else(|| ConnectorError::Other("malformed SHOW COLUMNS row".into()))?;
                let type_name: String = column
                    .get(1)
                    .ok_or_else(|| ConnectorError::Other("malformed SHOW COLUMNS row".into()))?;
                let nullable: String = column.get(2).unwrap_or_else(|| "NO".to_owned());
                let default: Option<String> = column.get::<Option<String>, _>(4).flatten();

                schema.insert(
                    &field,
                    types::type_from_name(&type_name)?,
                    nullable.eq_ignore_ascii_case("yes"),
                    default.is_some(),
                );
            }

            let count: Option<u64> = conn
                .query_first(format!(
                    "SELECT COUNT(*) FROM `{table}`{}",
                    filters.build_sql(&table)
                ))
                .await?;

            collections.push(DataCollectionDetail {
                name: table,
                schema,
                expected_row_count: count.unwrap_or(0),
            });
        }

        Ok(DatabaseDetail {
            name: database,
            collections,
        })
    }

    fn as_readable(&mut self) -> Option<&mut dyn ReadableConnection> {
        Some(self)
    }

    fn as_filterable(&mut self) -> Option<&mut dyn FilterableConnection> {
        Some(self)
    }

    fn as_sortable(&mut self) -> Option<&mut dyn SortableConnection> {
        Some(self)
    }
}

#[async_trait]
impl ReadableConnection for MySqlConnection {
    async fn read(
        &mut self,
        collection: &str,
        start: u64,
        end: u64,
    ) -> Result<Batch, ConnectorError> {
        let sql = format!(
            "SELECT * FROM `{collection}`{}{} LIMIT {start}, {count}",
            self.filters.build_sql(collection),
            self.sorts.build_sql(collection),
            count = end.saturating_sub(start),
        );
        let conn = self.conn()?;
        let rows: Vec<mysql_async::Row> = conn.query(sql).await?;

        let mut batch = Batch::new();
        for mut wire_row in rows {
            let columns = wire_row.columns();
            let mut row = Row::new();
            for (i, column) in columns.iter().enumerate() {
                let type_info = types::type_from_column(column.column_type(), column.flags())?;
                let raw: mysql_async::Value = wire_row
                    .take(i)
                    .unwrap_or(mysql_async::Value::NULL);
                let mut value = type_info.new_value();
                value.parse(datum_from_wire(raw))?;
                row.push(column.name_str().into_owned(), value);
            }
            batch.add(row);
        }
        Ok(batch)
    }
}

impl FilterableConnection for MySqlConnection {
    fn filter_builder(&mut self) -> &mut FilterBuilder {
        &mut self.filters
    }
}

impl SortableConnection for MySqlConnection {
    fn sort_builder(&mut self) -> &mut SortBuilder {
        &mut self.sorts
    }
}

/// Lowers a wire value onto the engine-neutral datum enum.
fn datum_from_wire(value: mysql_async::Value) -> Datum {
    use mysql_async::Value as Wire;
    match value {
        Wire::NULL => Datum::Null,
        Wire::Bytes(bytes) => Datum::Bytes(bytes),
        Wire::Int(v) => Datum::Int64(v),
        Wire::UInt(v) => Datum::Uint64(v),
        Wire::Float(v) => Datum::Float32(v),
        Wire::Double(v) => Datum::Float64(v),
        Wire::Date(year, month, day, hour, minute, second, micros) => {
            let Some(date) =
                NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
            else {
                return Datum::Null;
            };
            if hour == 0 && minute == 0 && second == 0 && micros == 0 {
                Datum::Date(date)
            } else {
                date.and_hms_micro_opt(
                    u32::from(hour),
                    u32::from(minute),
                    u32::from(second),
                    micros,
                )
                .map_or(Datum::Null, Datum::DateTime)
            }
        }
        Wire::Time(negative, days, hours, minutes, seconds, micros) => {
            // No dedicated TIME value type; carried textually.
            let sign = if negative { "-" } else { "" };
            let hours = days * 24 + u32::from(hours);
            Datum::Text(format!(
                "{sign}{hours:02}:{minutes:02}:{seconds:02}.{micros:06}"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datum_from_wire_scalars() {
        assert_eq!(datum_from_wire(mysql_async::Value::NULL), Datum::Null);
        assert_eq!(
            datum_from_wire(mysql_async::Value::Int(-5)),
            Datum::Int64(-5)
        );
        assert_eq!(
            datum_from_wire(mysql_async::Value::Bytes(b"hi".to_vec())),
            Datum::Bytes(b"hi".to_vec())
        );
    }

    #[test]
    fn test_datum_from_wire_dates() {
        let date_only = datum_from_wire(mysql_async::Value::Date(2023, 6, 1, 0, 0, 0, 0));
        assert!(matches!(date_only, Datum::Date(_)));

        let with_time = datum_from_wire(mysql_async::Value::Date(2023, 6, 1, 12, 30, 0, 0));
        assert!(matches!(with_time, Datum::DateTime(_)));

        let invalid = datum_from_wire(mysql_async::Value::Date(2023, 13, 1, 0, 0, 0, 0));
        assert_eq!(invalid, Datum::Null);
    }

    #[test]
    fn test_datum_from_wire_time_is_textual() {
        let t = datum_from_wire(mysql_async::Value::Time(true, 1, 2, 3, 4, 5));
        assert_eq!(t, Datum::Text("-26:03:04.000005".into()));
    }
}
