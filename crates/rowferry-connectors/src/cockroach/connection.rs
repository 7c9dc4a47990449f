//! CockroachDB connection.
//!
//! Writes go through transactional `COPY … FROM STDIN`: the incoming
//! batch is planned against the destination schema (defaults dropped,
//! nulls materialised, values converted), each resulting column-set
//! group is streamed as one COPY, and the transaction commits only when
//! every group succeeded.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::SinkExt;
use tokio_postgres::error::SqlState;

use rowferry_core::{Batch, Datum, SchemaMap, Value};

use super::config::CockroachConfig;
use super::types;
use crate::driver::{
    Connection, DataCollectionDetail, DatabaseDetail, FilterableConnection, SortableConnection,
    WritableConnection,
};
use crate::error::ConnectorError;
use crate::filter::FilterBuilder;
use crate::sort::SortBuilder;
use crate::write_plan::plan_batch;

/// A writable, filterable, sortable CockroachDB connection.
pub struct CockroachConnection {
    client: Option<tokio_postgres::Client>,
    io_task: Option<tokio::task::JoinHandle<()>>,
    config: CockroachConfig,
    filters: FilterBuilder,
    sorts: SortBuilder,
    schema_cache: std::collections::HashMap<String, SchemaMap>,
}

impl CockroachConnection {
    pub(super) fn new(
        client: tokio_postgres::Client,
        io_task: tokio::task::JoinHandle<()>,
        config: CockroachConfig,
    ) -> Self {
        Self {
            client: Some(client),
            io_task: Some(io_task),
            config,
            filters: FilterBuilder::new(),
            sorts: SortBuilder::new(),
            schema_cache: std::collections::HashMap::new(),
        }
    }

    fn client(&mut self) -> Result<&mut tokio_postgres::Client, ConnectorError> {
        self.client
            .as_mut()
            .ok_or(ConnectorError::ConnectionIsClosed)
    }

    async fn introspect_schema(&mut self, table: &str) -> Result<SchemaMap, ConnectorError> {
        if let Some(schema) = self.schema_cache.get(table) {
            return Ok(schema.clone());
        }
        let rows = self
            .client()?
            .query(
                "SELECT column_name, data_type, is_nullable, column_default \
                 FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = $1 \
                 ORDER BY ordinal_position",
                &[&table],
            )
            .await?;

        let mut schema = SchemaMap::new();
        for row in rows {
            let name: String = row.get(0);
            let type_name: String = row.get(1);
            let nullable: String = row.get(2);
            let default: Option<String> = row.get(3);
            schema.insert(
                &name,
                types::type_from_name(&type_name)?,
                nullable.eq_ignore_ascii_case("yes"),
                default.is_some(),
            );
        }
        self.schema_cache.insert(table.to_owned(), schema.clone());
        Ok(schema)
    }
}

#[async_trait]
impl Connection for CockroachConnection {
    async fn close(&mut self) -> Result<(), ConnectorError> {
        // Dropping the client ends the connection; the I/O task then
        // winds down on its own.
        self.client.take();
        if let Some(task) = self.io_task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.client.as_ref().map_or(true, tokio_postgres::Client::is_closed)
    }

    async fn ping(&mut self) -> Result<(), ConnectorError> {
        self.client()?.batch_execute("SELECT 1").await?;
        Ok(())
    }

    async fn get_details(&mut self) -> Result<DatabaseDetail, ConnectorError> {
        let database = self.config.database.clone();
        let tables: Vec<String> = self
            .client()?
            .query(
                "SELECT table_name FROM information_schema.tables \
                 WHERE table_schema = 'public' AND table_type = 'BASE TABLE' \
                 ORDER BY table_name",
                &[],
            )
            .await?
            .into_iter()
            .map(|row| row.get(0))
            .collect();

        let mut collections = Vec::with_capacity(tables.len());
        for table in tables {
            let schema = self.introspect_schema(&table).await?;
            let count_sql = format!(
                "SELECT count(*) FROM \"{table}\"{}",
                self.filters.build_sql(&table)
            );
            let count: i64 = self.client()?.query_one(&count_sql, &[]).await?.get(0);
            collections.push(DataCollectionDetail {
                name: table,
                schema,
                expected_row_count: count.try_into().unwrap_or(0),
            });
        }

        Ok(DatabaseDetail {
            name: database,
            collections,
        })
    }

    fn as_writable(&mut self) -> Option<&mut dyn WritableConnection> {
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
impl WritableConnection for CockroachConnection {
    async fn write(&mut self, collection: &str, batch: Batch) -> Result<(), ConnectorError> {
        if batch.is_empty() {
            return Ok(());
        }
        let schema = self.introspect_schema(collection).await?;
        let groups = plan_batch(&schema, batch)?;

        let client = self.client()?;
        let tx = client.transaction().await.map_err(map_pg_error)?;
        for group in &groups {
            if group.is_empty() {
                continue;
            }
            let columns = group
                .columns
                .iter()
                .map(|c| format!("\"{c}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let stmt = format!("COPY \"{collection}\" ({columns}) FROM STDIN");
            let sink = tx.copy_in(&stmt).await.map_err(map_pg_error)?;
            futures_util::pin_mut!(sink);

            let mut payload = String::new();
            for row in &group.rows {
                encode_copy_row(&mut payload, row);
            }
            sink.send(Bytes::from(payload)).await.map_err(map_pg_error)?;
            sink.finish().await.map_err(map_pg_error)?;
        }
        tx.commit().await.map_err(map_pg_error)?;
        Ok(())
    }
}

impl FilterableConnection for CockroachConnection {
    fn filter_builder(&mut self) -> &mut FilterBuilder {
        &mut self.filters
    }
}

impl SortableConnection for CockroachConnection {
    fn sort_builder(&mut self) -> &mut SortBuilder {
        &mut self.sorts
    }
}

fn map_pg_error(err: tokio_postgres::Error) -> ConnectorError {
    if err.code() == Some(&SqlState::UNIQUE_VIOLATION) {
        ConnectorError::DataSetDuplicate(err.to_string())
    } else {
        ConnectorError::Postgres(err)
    }
}

/// Appends one row in COPY text format: tab-separated fields, `\N` for
/// null, newline-terminated.
fn encode_copy_row(out: &mut String, row: &[Box<dyn Value>]) {
    for (i, value) in row.iter().enumerate() {
        if i > 0 {
            out.push('\t');
        }
        match value.get() {
            None | Some(Datum::Null) => out.push_str("\\N"),
            Some(datum) => encode_copy_field(out, &datum),
        }
    }
    out.push('\n');
}

fn encode_copy_field(out: &mut String, datum: &Datum) {
    match datum {
        Datum::Bool(b) => out.push_str(if *b { "t" } else { "f" }),
        Datum::Bytes(bytes) => {
            // bytea hex form; the leading backslash itself needs the
            // COPY escape.
            out.push_str("\\\\x");
            for byte in bytes {
                out.push_str(&format!("{byte:02x}"));
            }
        }
        Datum::Date(d) => out.push_str(&d.format("%Y-%m-%d").to_string()),
        Datum::DateTime(dt) => out.push_str(&dt.format("%Y-%m-%d %H:%M:%S%.6f").to_string()),
        Datum::Timestamp(ts) => {
            out.push_str(&ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string());
        }
        other => {
            for ch in other.to_string().chars() {
                match ch {
                    '\\' => out.push_str("\\\\"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    _ => out.push(ch),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowferry_core::types as generic;

    fn value_of(datum: Datum, info: rowferry_core::TypeInfo) -> Box<dyn Value> {
        let mut v = info.new_value();
        v.parse(datum).unwrap();
        v
    }

    #[test]
    fn test_encode_copy_row_scalars_and_null() {
        let mut out = String::new();
        encode_copy_row(
            &mut out,
            &[
                value_of(Datum::Int64(1), generic::INT64),
                generic::STRING.new_value(),
                value_of(Datum::Bool(true), generic::BOOL),
            ],
        );
        assert_eq!(out, "1\t\\N\tt\n");
    }

    #[test]
    fn test_encode_copy_field_escapes_text() {
        let mut out = String::new();
        encode_copy_field(&mut out, &Datum::Text("a\tb\nc\\d".into()));
        assert_eq!(out, "a\\tb\\nc\\\\d");
    }

    #[test]
    fn test_encode_copy_field_bytes_hex() {
        let mut out = String::new();
        encode_copy_field(&mut out, &Datum::Bytes(vec![0xde, 0xad]));
        assert_eq!(out, "\\\\xdead");
    }
}
