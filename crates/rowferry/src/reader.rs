//! The reader.
//!
//! Splits the collection's `[start, end)` row range across worker
//! tasks by linear interpolation. Each worker owns one pooled source
//! connection and streams batches from its sub-range in
//! `rows_per_batch` strides; a coupling task per worker drains the
//! worker's channel into the shared buffer so slow buffer admission
//! back-pressures the producer through the channel. Read errors are
//! retried without bound until cancellation; when every worker has
//! finished, the reader closes the buffer, which is the shutdown signal
//! to the writer side.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use rowferry_core::{Batch, Buffer, Row, SchemaMap};
use rowferry_connectors::{ConnectionPool, ConnectorError};

use crate::error::MigrationError;
use crate::{DEFAULT_ROWS_PER_BATCH, DEFAULT_WORKERS};

/// Streams one collection from the source into the buffer.
pub struct Reader {
    cancel: CancellationToken,
    collection: String,
    buffer: Arc<Buffer>,
    schema: SchemaMap,
    pool: Arc<ConnectionPool>,
    rows_per_batch: u64,
    workers: u32,
    start_offset: u64,
    end_offset: u64,
}

impl Reader {
    /// Creates a reader with default batch size, worker count, and a
    /// zero (unset) end offset.
    #[must_use]
    pub fn new(
        cancel: CancellationToken,
        collection: impl Into<String>,
        buffer: Arc<Buffer>,
        schema: SchemaMap,
        pool: Arc<ConnectionPool>,
    ) -> Self {
        Self {
            cancel,
            collection: collection.into(),
            buffer,
            schema,
            pool,
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
            workers: DEFAULT_WORKERS,
            start_offset: 0,
            end_offset: 0,
        }
    }

    /// Sets the stride of each worker's reads.
    pub fn set_rows_per_batch(&mut self, rows: u64) {
        self.rows_per_batch = rows.max(1);
    }

    /// Sets the worker count.
    pub fn set_workers(&mut self, workers: u32) {
        self.workers = workers.max(1);
    }

    /// Sets the first row offset to stream (inclusive).
    pub fn set_start_offset(&mut self, offset: u64) {
        self.start_offset = offset;
    }

    /// Sets the end row offset (exclusive). Required before `start`.
    pub fn set_end_offset(&mut self, offset: u64) {
        self.end_offset = offset;
    }

    /// Runs the reader to completion: all workers drained, buffer
    /// closed, pool connections closed.
    ///
    /// # Errors
    ///
    /// Offset validation errors before any task starts; otherwise the
    /// first fatal worker error (connection acquisition, a source
    /// without the readable capability, or a buffer write failure
    /// outside cancellation).
    pub async fn start(&self) -> Result<(), MigrationError> {
        if self.schema.is_empty() {
            return Err(MigrationError::DataMapNotSet);
        }
        if self.end_offset == 0 {
            return Err(MigrationError::EndOffsetRequired);
        }
        if self.end_offset < self.start_offset {
            return Err(MigrationError::EndOffsetLessThanStart);
        }

        let result = self.run_workers().await;

        // Closing the buffer is the shutdown signal for the writer; a
        // cancellation may have closed it already.
        if self.buffer.close().is_err() {
            tracing::debug!(collection = %self.collection, "buffer was already closed");
        }
        if let Err(e) = self.pool.close_all().await {
            tracing::warn!(collection = %self.collection, error = %e, "closing reader pool failed");
        }
        result
    }

    async fn run_workers(&self) -> Result<(), MigrationError> {
        let ranges = partition(self.start_offset, self.end_offset, self.workers);
        let mut tasks: JoinSet<Result<(), MigrationError>> = JoinSet::new();

        for (worker, (lo, hi)) in ranges.into_iter().enumerate() {
            let ctx = WorkerContext {
                cancel: self.cancel.clone(),
                collection: self.collection.clone(),
                buffer: Arc::clone(&self.buffer),
                pool: Arc::clone(&self.pool),
                rows_per_batch: self.rows_per_batch,
            };
            tasks.spawn(run_worker(ctx, worker, lo, hi));
        }

        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(collection = %self.collection, error = %e, "reader worker failed");
                    // Unblock sibling workers; the controller records
                    // the cause from our return value.
                    self.cancel.cancel();
                    first_err.get_or_insert(e);
                }
                Err(join_err) if join_err.is_panic() => {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                Err(_) => {}
            }
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

/// One worker: a producer task streaming strides from the source into a
/// channel, and a coupling task expanding batches into buffer writes.
async fn run_worker(
    ctx: WorkerContext,
    worker: usize,
    lo: u64,
    hi: u64,
) -> Result<(), MigrationError> {
    if lo >= hi {
        // Surplus worker for a small range; nothing to stream.
        return Ok(());
    }
    let (conn, slot) = ctx.pool.connect().await?;
    let (tx, mut rx) = mpsc::channel::<Batch>(1);

    let producer = {
        let cancel = ctx.cancel.clone();
        let collection = ctx.collection.clone();
        let pool = Arc::clone(&ctx.pool);
        let rows_per_batch = ctx.rows_per_batch;
        tokio::spawn(async move {
            let mut guard = conn.lock().await;
            let Some(readable) = guard.as_readable() else {
                return Err(MigrationError::Connector(ConnectorError::NotReadable(
                    collection,
                )));
            };

            let mut offset = lo;
            'ranges: while offset < hi {
                let stride = rows_per_batch.min(hi - offset);
                loop {
                    tokio::select! {
                        biased;

                        () = cancel.cancelled() => {
                            tracing::debug!(collection = %collection, worker, "reader worker cancelled");
                            break 'ranges;
                        }

                        result = readable.read(&collection, offset, offset + stride) => match result {
                            Ok(batch) => {
                                if !batch.is_empty() && tx.send(batch).await.is_err() {
                                    // Coupling task is gone; stop producing.
                                    break 'ranges;
                                }
                                break;
                            }
                            Err(e) => {
                                tracing::warn!(
                                    collection = %collection,
                                    start = offset,
                                    end = offset + stride,
                                    error = %e,
                                    "read failed, retrying"
                                );
                            }
                        }
                    }
                }
                offset += stride;
            }

            drop(guard);
            if let Err(e) = pool.close(slot).await {
                tracing::warn!(collection = %collection, error = %e, "closing reader connection failed");
            }
            Ok(())
        })
    };

    let coupler = {
        let cancel = ctx.cancel.clone();
        let buffer = Arc::clone(&ctx.buffer);
        tokio::spawn(async move {
            while let Some(batch) = rx.recv().await {
                let rows: Vec<Row> = batch.into_rows().collect();
                if let Err(e) = buffer.write(rows).await {
                    if cancel.is_cancelled() {
                        // Ordinary teardown; the buffer closed under us.
                        return Ok(());
                    }
                    return Err(MigrationError::Buffer(e));
                }
            }
            Ok(())
        })
    };

    let mut first_err = None;
    for handle in [producer, coupler] {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                first_err.get_or_insert(e);
            }
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic());
            }
            Err(_) => {}
        }
    }
    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Splits `[start, end)` into `workers` half-open sub-ranges by linear
/// interpolation. Sub-ranges are disjoint and their union covers the
/// range exactly; surplus workers receive empty sub-ranges.
#[must_use]
pub fn partition(start: u64, end: u64, workers: u32) -> Vec<(u64, u64)> {
    let workers = u128::from(workers.max(1));
    let span = u128::from(end.saturating_sub(start));
    #[allow(clippy::cast_possible_truncation)]
    (0..workers)
        .map(|i| {
            let lo = start + (i * span / workers) as u64;
            let hi = start + ((i + 1) * span / workers) as u64;
            (lo, hi)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowferry_connectors::testing::{MemoryDriver, MemoryStore};
    use rowferry_connectors::{Connector, Driver};
    use rowferry_core::types;
    use rowferry_core::Datum;

    fn seeded_fixture(rows: i64) -> (Arc<ConnectionPool>, SchemaMap) {
        let store = MemoryStore::new();
        let mut schema = SchemaMap::new();
        schema.insert("id", types::INT64, false, false);
        store.create_table("items", schema.clone());
        store.insert_rows(
            "items",
            (0..rows).map(|i| {
                let mut row = Row::new();
                let mut id = types::INT64.new_value();
                id.parse(Datum::Int64(i)).unwrap();
                row.push("id", id);
                row
            }),
        );
        let driver: Arc<dyn Driver> = Arc::new(MemoryDriver::new("mem", store));
        let pool = Arc::new(ConnectionPool::new(Arc::new(Connector::new(driver, ""))));
        (pool, schema)
    }

    #[tokio::test]
    async fn test_reader_streams_all_rows_and_closes_buffer() {
        let (pool, schema) = seeded_fixture(25);
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(cancel.clone()));

        let mut reader = Reader::new(cancel, "items", Arc::clone(&buffer), schema, pool);
        reader.set_rows_per_batch(4);
        reader.set_workers(3);
        reader.set_end_offset(25);
        reader.start().await.unwrap();

        assert!(buffer.is_closed());
        let mut count = 0;
        while buffer.read().await.is_ok() {
            count += 1;
        }
        assert_eq!(count, 25);
    }

    #[tokio::test]
    async fn test_reader_validation_errors() {
        let (pool, schema) = seeded_fixture(1);
        let cancel = CancellationToken::new();
        let buffer = Arc::new(Buffer::new(cancel.clone()));

        let mut reader = Reader::new(
            cancel.clone(),
            "items",
            Arc::clone(&buffer),
            schema.clone(),
            Arc::clone(&pool),
        );
        assert!(matches!(
            reader.start().await.unwrap_err(),
            MigrationError::EndOffsetRequired
        ));

        reader.set_start_offset(10);
        reader.set_end_offset(5);
        assert!(matches!(
            reader.start().await.unwrap_err(),
            MigrationError::EndOffsetLessThanStart
        ));

        let mut no_schema = Reader::new(cancel, "items", buffer, SchemaMap::new(), pool);
        no_schema.set_end_offset(1);
        assert!(matches!(
            no_schema.start().await.unwrap_err(),
            MigrationError::DataMapNotSet
        ));
    }

    #[test]
    fn test_partition_covers_range_exactly() {
        for (start, end, workers) in [(0, 1000, 4), (10, 17, 3), (5, 5, 2), (0, 7, 16)] {
            let parts = partition(start, end, workers);
            assert_eq!(parts.len(), workers as usize);
            assert_eq!(parts.first().unwrap().0, start);
            assert_eq!(parts.last().unwrap().1, end);
            for pair in parts.windows(2) {
                assert_eq!(pair[0].1, pair[1].0, "ranges must tile");
            }
            let total: u64 = parts.iter().map(|(lo, hi)| hi - lo).sum();
            assert_eq!(total, end - start);
        }
    }

    #[test]
    fn test_partition_small_range_leaves_surplus_workers_empty() {
        let parts = partition(0, 2, 4);
        let non_empty = parts.iter().filter(|(lo, hi)| lo < hi).count();
        assert_eq!(non_empty, 2);
    }

    #[test]
    fn test_partition_zero_workers_clamped() {
        let parts = partition(0, 10, 0);
        assert_eq!(parts, vec![(0, 10)]);
    }

    #[test]
    fn test_read_call_bound() {
        // Across all workers the number of strides is bounded by
        // ceil(span / batch) + workers.
        for (span, workers, batch) in [(1000u64, 4u32, 50u64), (997, 3, 10), (10, 4, 100)] {
            let parts = partition(0, span, workers);
            let calls: u64 = parts
                .iter()
                .map(|(lo, hi)| (hi - lo).div_ceil(batch))
                .sum();
            assert!(calls <= span.div_ceil(batch) + u64::from(workers));
        }
    }
}
