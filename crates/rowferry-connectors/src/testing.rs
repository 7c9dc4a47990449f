//! In-memory driver.
//!
//! A fully functional readable+writable driver backed by a shared
//! [`MemoryStore`], used by the integration suite and available to
//! embedders for dry runs. It evaluates filter and sort configuration
//! the way a SQL driver would push them down, counts rows under the
//! current filters, and routes writes through the same
//! [`write_plan`](crate::write_plan) path as the real destination
//! drivers. Read failures can be injected to exercise retry paths.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use rowferry_core::{Batch, Datum, Kind, Row, SchemaMap};

use crate::driver::{
    Connection, DataCollectionDetail, DatabaseDetail, Driver, FilterableConnection,
    ReadableConnection, SortableConnection, WritableConnection,
};
use crate::error::ConnectorError;
use crate::filter::{Filter, FilterBuilder, Operator};
use crate::registry;
use crate::sort::{Direction, SortBuilder};
use crate::write_plan::plan_batch;

struct MemoryTable {
    name: String,
    schema: SchemaMap,
    rows: Vec<Row>,
}

/// Shared backing store for one in-memory database.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Vec<MemoryTable>>,
    fail_reads: AtomicU32,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Creates a table (replacing any previous one of the same name).
    pub fn create_table(&self, name: &str, schema: SchemaMap) {
        let mut tables = self.tables.lock();
        tables.retain(|t| t.name != name);
        tables.push(MemoryTable {
            name: name.to_owned(),
            schema,
            rows: Vec::new(),
        });
    }

    /// Appends rows to a table. Unknown tables are a no-op.
    pub fn insert_rows(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut tables = self.tables.lock();
        if let Some(t) = tables.iter_mut().find(|t| t.name == table) {
            t.rows.extend(rows);
        }
    }

    /// Snapshot of a table's rows.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .lock()
            .iter()
            .find(|t| t.name == table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Current row count of a table.
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .iter()
            .find(|t| t.name == table)
            .map_or(0, |t| t.rows.len())
    }

    /// Makes the next `n` reads fail, after which reads succeed again.
    pub fn fail_next_reads(&self, n: u32) {
        self.fail_reads.store(n, AtomicOrdering::SeqCst);
    }

    fn take_read_failure(&self) -> bool {
        self.fail_reads
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok()
    }
}

/// The in-memory driver. Register one instance per backing store, under
/// a unique name.
pub struct MemoryDriver {
    name: String,
    store: Arc<MemoryStore>,
}

impl MemoryDriver {
    /// Creates a driver over `store`.
    #[must_use]
    pub fn new(name: impl Into<String>, store: Arc<MemoryStore>) -> Self {
        Self {
            name: name.into(),
            store,
        }
    }
}

/// Registers a memory driver over `store` in the global registry under
/// `name`.
pub fn register_memory_driver(name: &str, store: &Arc<MemoryStore>) {
    registry::global().register(Arc::new(MemoryDriver::new(name, Arc::clone(store))));
}

#[async_trait]
impl Driver for MemoryDriver {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_readable(&self) -> bool {
        true
    }

    fn is_writable(&self) -> bool {
        true
    }

    async fn open(&self, _dsn: &str) -> Result<Box<dyn Connection>, ConnectorError> {
        Ok(Box::new(MemoryConnection {
            store: Arc::clone(&self.store),
            name: self.name.clone(),
            filters: FilterBuilder::new(),
            sorts: SortBuilder::new(),
            closed: false,
        }))
    }
}

struct MemoryConnection {
    store: Arc<MemoryStore>,
    name: String,
    filters: FilterBuilder,
    sorts: SortBuilder,
    closed: bool,
}

impl MemoryConnection {
    fn ensure_open(&self) -> Result<(), ConnectorError> {
        if self.closed {
            Err(ConnectorError::ConnectionIsClosed)
        } else {
            Ok(())
        }
    }

    /// Rows of `collection` under the current filter and sort
    /// configuration.
    fn view(&self, collection: &str) -> Vec<Row> {
        let tables = self.store.tables.lock();
        let Some(table) = tables.iter().find(|t| t.name == collection) else {
            return Vec::new();
        };
        let mut rows: Vec<Row> = table
            .rows
            .iter()
            .filter(|row| {
                self.filters
                    .applicable(collection)
                    .into_iter()
                    .all(|f| filter_matches(row, f))
            })
            .cloned()
            .collect();

        let sorts = self.sorts.applicable(collection);
        if !sorts.is_empty() {
            rows.sort_by(|a, b| {
                for sort in &sorts {
                    let ord = compare_values(a, b, &sort.column);
                    let ord = match sort.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }
        rows
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn close(&mut self) -> Result<(), ConnectorError> {
        self.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    async fn ping(&mut self) -> Result<(), ConnectorError> {
        self.ensure_open()
    }

    async fn get_details(&mut self) -> Result<DatabaseDetail, ConnectorError> {
        self.ensure_open()?;
        let names: Vec<(String, SchemaMap)> = {
            let tables = self.store.tables.lock();
            tables
                .iter()
                .map(|t| (t.name.clone(), t.schema.clone()))
                .collect()
        };
        let collections = names
            .into_iter()
            .map(|(name, schema)| {
                let count = self.view(&name).len() as u64;
                DataCollectionDetail {
                    name,
                    schema,
                    expected_row_count: count,
                }
            })
            .collect();
        Ok(DatabaseDetail {
            name: self.name.clone(),
            collections,
        })
    }

    fn as_readable(&mut self) -> Option<&mut dyn ReadableConnection> {
        Some(self)
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
impl ReadableConnection for MemoryConnection {
    async fn read(
        &mut self,
        collection: &str,
        start: u64,
        end: u64,
    ) -> Result<Batch, ConnectorError> {
        self.ensure_open()?;
        if self.store.take_read_failure() {
            return Err(ConnectorError::Other("injected read failure".into()));
        }
        let rows = self.view(collection);
        let start = usize::try_from(start).unwrap_or(usize::MAX).min(rows.len());
        let end = usize::try_from(end).unwrap_or(usize::MAX).min(rows.len());
        Ok(rows[start..end.max(start)].iter().cloned().collect())
    }
}

#[async_trait]
impl WritableConnection for MemoryConnection {
    async fn write(&mut self, collection: &str, batch: Batch) -> Result<(), ConnectorError> {
        self.ensure_open()?;
        let schema = {
            let tables = self.store.tables.lock();
            tables
                .iter()
                .find(|t| t.name == collection)
                .map(|t| t.schema.clone())
                .ok_or_else(|| {
                    ConnectorError::Other(format!("table not found: {collection}"))
                })?
        };
        let groups = plan_batch(&schema, batch)?;
        let mut assembled = Vec::new();
        for group in groups {
            for values in group.rows {
                let mut row = Row::new();
                for (column, value) in group.columns.iter().zip(values) {
                    row.push(column.clone(), value);
                }
                assembled.push(row);
            }
        }
        self.store.insert_rows(collection, assembled);
        Ok(())
    }
}

impl FilterableConnection for MemoryConnection {
    fn filter_builder(&mut self) -> &mut FilterBuilder {
        &mut self.filters
    }
}

impl SortableConnection for MemoryConnection {
    fn sort_builder(&mut self) -> &mut SortBuilder {
        &mut self.sorts
    }
}

/// Evaluates one filter against one row. Null never matches.
fn filter_matches(row: &Row, filter: &Filter) -> bool {
    let Some(value) = row.get(&filter.column) else {
        return false;
    };
    let Some(datum) = value.get() else {
        return false;
    };
    let Some(ord) = compare_datum_to_literal(&datum, &filter.value) else {
        return false;
    };
    match filter.operator {
        Operator::Eq => ord == Ordering::Equal,
        Operator::Ne => ord != Ordering::Equal,
        Operator::Gt => ord == Ordering::Greater,
        Operator::Lt => ord == Ordering::Less,
        Operator::Ge => ord != Ordering::Less,
        Operator::Le => ord != Ordering::Greater,
    }
}

fn compare_datum_to_literal(datum: &Datum, literal: &str) -> Option<Ordering> {
    match datum.kind() {
        k if k.compatible_with(Kind::Float64) => {
            let lhs = datum.to_f64()?;
            let rhs: f64 = literal.trim().parse().ok()?;
            lhs.partial_cmp(&rhs)
        }
        Kind::Bool => {
            let lhs = datum.to_bool()?;
            let rhs = Datum::Text(literal.to_owned()).to_bool()?;
            Some(lhs.cmp(&rhs))
        }
        _ => Some(datum.to_string().cmp(&literal.trim_matches('\'').to_owned())),
    }
}

/// Compares two rows on `column`; empty values order first.
fn compare_values(a: &Row, b: &Row, column: &str) -> Ordering {
    let da = a.get(column).and_then(|v| v.get());
    let db = b.get(column).and_then(|v| v.get());
    match (da, db) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(da), Some(db)) => {
            if let (Some(fa), Some(fb)) = (da.to_f64(), db.to_f64()) {
                fa.partial_cmp(&fb).unwrap_or(Ordering::Equal)
            } else {
                da.to_string().cmp(&db.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Sort;
    use rowferry_core::types;

    fn seeded_store(rows: i64) -> Arc<MemoryStore> {
        let store = MemoryStore::new();
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);
        schema.insert("name", types::STRING, true, false);
        store.create_table("users", schema);
        store.insert_rows(
            "users",
            (0..rows).map(|i| {
                let mut row = Row::new();
                let mut id = types::INT64.new_value();
                id.parse(Datum::Int64(i)).unwrap();
                row.push("id", id);
                let mut name = types::STRING.new_value();
                name.parse(Datum::Text(format!("user-{i}"))).unwrap();
                row.push("name", name);
                row
            }),
        );
        store
    }

    async fn open(store: &Arc<MemoryStore>) -> Box<dyn Connection> {
        MemoryDriver::new("mem", Arc::clone(store))
            .open("")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_read_respects_offsets() {
        let store = seeded_store(10);
        let mut conn = open(&store).await;
        let batch = conn
            .as_readable()
            .unwrap()
            .read("users", 2, 5)
            .await
            .unwrap();
        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch.get(0).unwrap().get("id").unwrap().get(),
            Some(Datum::Int64(2))
        );
    }

    #[tokio::test]
    async fn test_read_beyond_end_is_empty() {
        let store = seeded_store(3);
        let mut conn = open(&store).await;
        let batch = conn
            .as_readable()
            .unwrap()
            .read("users", 10, 20)
            .await
            .unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_filters_apply_to_reads_and_counts() {
        let store = seeded_store(100);
        let mut conn = open(&store).await;
        conn.as_filterable()
            .unwrap()
            .filter_builder()
            .push_root(Filter::new("id", Operator::Gt, "50"));

        let details = conn.get_details().await.unwrap();
        assert_eq!(details.collections[0].expected_row_count, 49);

        let batch = conn
            .as_readable()
            .unwrap()
            .read("users", 0, 100)
            .await
            .unwrap();
        assert_eq!(batch.len(), 49);
    }

    #[tokio::test]
    async fn test_sorts_apply_to_reads() {
        let store = seeded_store(5);
        let mut conn = open(&store).await;
        conn.as_sortable()
            .unwrap()
            .sort_builder()
            .push("users", Sort::new("id", Direction::Desc));
        let batch = conn
            .as_readable()
            .unwrap()
            .read("users", 0, 5)
            .await
            .unwrap();
        assert_eq!(
            batch.get(0).unwrap().get("id").unwrap().get(),
            Some(Datum::Int64(4))
        );
    }

    #[tokio::test]
    async fn test_injected_read_failures() {
        let store = seeded_store(1);
        store.fail_next_reads(2);
        let mut conn = open(&store).await;
        let readable = conn.as_readable().unwrap();
        assert!(readable.read("users", 0, 1).await.is_err());
        assert!(readable.read("users", 0, 1).await.is_err());
        assert!(readable.read("users", 0, 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_write_through_plan() {
        let store = seeded_store(0);
        let src = seeded_store(2);
        let mut conn = open(&store).await;

        let batch: Batch = src.rows("users").into_iter().collect();
        conn.as_writable()
            .unwrap()
            .write("users", batch)
            .await
            .unwrap();
        assert_eq!(store.row_count("users"), 2);
    }
}
