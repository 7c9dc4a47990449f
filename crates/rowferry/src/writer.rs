//! The writer.
//!
//! A pool of worker tasks drains the buffer: each worker fills a batch
//! of up to `rows_per_batch` rows, hands it to its pooled destination
//! connection as one bulk write, and exits once the buffer is closed and
//! drained. A write failure is fatal to the collection; the failing
//! worker cancels the pipeline so its siblings (and a reader blocked on
//! buffer admission) unwind instead of waiting forever.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use rowferry_core::{Batch, Buffer};
use rowferry_connectors::{ConnectionPool, ConnectorError};

use crate::error::MigrationError;
use crate::{DEFAULT_ROWS_PER_BATCH, DEFAULT_WORKERS};

/// Drains the buffer of one collection into the destination.
pub struct Writer {
    cancel: CancellationToken,
    collection: String,
    buffer: Arc<Buffer>,
    pool: Arc<ConnectionPool>,
    rows_per_batch: u64,
    workers: u32,
}

impl Writer {
    /// Creates a writer with default batch size and worker count.
    #[must_use]
    pub fn new(
        cancel: CancellationToken,
        collection: impl Into<String>,
        buffer: Arc<Buffer>,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            cancel,
            collection: collection.into(),
            buffer,
            pool,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Sets the number of rows assembled per bulk write.
    pub fn set_rows_per_batch(&mut self, rows: u64) {
        self.rows_per_batch = rows.max(1);
    }

    /// Sets the worker count.
    pub fn set_workers(&mut self, workers: u32) {
        self.workers = workers.max(1);
    }

    /// Runs the writer until the buffer is closed and drained.
    ///
    /// # Errors
    ///
    /// The first fatal worker error: connection acquisition, a
    /// destination without the writable capability, or a failed bulk
    /// write.
    pub async fn start(&self) -> Result<(), MigrationError> {
        let mut tasks: JoinSet<Result<(), MigrationError>> = JoinSet::new();
        for worker in 0..self.workers.max(1) {
            let ctx = WorkerContext {
                cancel: self.cancel.clone(),
                collection: self.collection.clone(),
                buffer: Arc::clone(&self.buffer),
                pool: Arc::clone(&self.pool),
                rows_per_batch: self.rows_per_batch,
            };
            tasks.spawn(run_worker(ctx, worker));
        }

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(collection = %self.collection, error = %e, "writer worker failed");
                    // A fatal write aborts the collection: close the
                    // buffer (via cancellation) so sibling workers and
                    // the reader unwind.
                    self.cancel.cancel();
                    first_err.get_or_insert(e);
                }
                Err(join_err) if join_err.is_panic() => {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                Err(_) => {}
            }
        }

        if let Err(e) = self.pool.close_all().await {
            tracing::warn!(collection = %self.collection, error = %e, "closing writer pool failed");
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

struct WorkerContext {
    cancel: CancellationToken,
    collection: String,
    buffer: Arc<Buffer>,
    pool: Arc<ConnectionPool>,
    rows_per_batch: u64,
}

async fn run_worker(ctx: WorkerContext, worker: u32) -> Result<(), MigrationError> {
    let (conn, slot) = ctx.pool.connect().await?;
    let mut guard = conn.lock().await;
    let Some(writable) = guard.as_writable() else {
        return Err(MigrationError::Connector(ConnectorError::NotWritable(
            ctx.collection,
        )));
    };

    loop {
        let mut batch = Batch::new();
        for _ in 0..ctx.rows_per_batch {
            match ctx.buffer.read().await {
                Ok(row) => batch.add(row),
                // Closed and drained: flush what we have and wind down.
                Err(_) => break,
            }
        }

        if !batch.is_empty() {
            writable.write(&ctx.collection, batch).await?;
        }

        if ctx.buffer.is_closed() && ctx.buffer.is_empty() {
            tracing::debug!(collection = %ctx.collection, worker, "writer worker drained");
            drop(guard);
            if let Err(e) = ctx.pool.close(slot).await {
                tracing::warn!(collection = %ctx.collection, error = %e, "closing writer connection failed");
            }
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowferry_connectors::testing::{MemoryDriver, MemoryStore};
    use rowferry_connectors::{Connector, Driver};
    use rowferry_core::types;
    use rowferry_core::{Datum, Row, SchemaMap};

    fn dest_fixture() -> (Arc<MemoryStore>, Arc<ConnectionPool>) {
        let store = MemoryStore::new();
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);
        store.create_table("items", schema);
        let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new("mem", Arc::clone(&store)));
        let pool = Arc::new(ConnectionPool::new(Arc::new(Connector::new(driver, ""))));
        (store, pool)
    }

    fn item_row(id: i64) -> Row {
        let mut row = Row::new();
        let mut idv = types::INT64.new_value();
        idv.parse(Datum::Int64(id)).unwrap();
        row.push("id", idv);
        row
    }

    #[tokio::test]
    async fn test_writer_drains_closed_buffer() {
        let (store, pool) = dest_fixture();
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(cancel.clone()));
        buffer.write((0..10).map(item_row).collect()).await.unwrap();
        buffer.close().unwrap();

        let writer = Writer::new(cancel, "items", buffer, pool);
        writer.start().await.unwrap();
        assert_eq!(store.row_count("items"), 10);
    }

    #[tokio::test]
    async fn test_writer_partial_batch_when_rows_scarce() {
        let (store, pool) = dest_fixture();
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(cancel.clone()));
        buffer.write(vec![item_row(1), item_row(2)]).await.unwrap();
        buffer.close().unwrap();

        let mut writer = Writer::new(cancel, "items", buffer, pool);
        writer.set_rows_per_batch(1000);
        writer.set_workers(1);
        writer.start().await.unwrap();
        assert_eq!(store.row_count("items"), 2);
    }

    #[tokio::test]
    async fn test_writer_exits_while_writes_race_the_close() {
        let (store, pool) = dest_fixture();
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(cancel.clone()));

        let feeder = {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                for i in 0..50 {
                    buffer.write(vec![item_row(i)]).await.unwrap();
                }
                buffer.close().unwrap();
            })
        };

        let mut writer = Writer::new(cancel, "items", buffer, pool);
        writer.set_rows_per_batch(7);
        writer.set_workers(3);
        writer.start().await.unwrap();
        feeder.await.unwrap();
        assert_eq!(store.row_count("items"), 50);
    }
}
