//! Pipeline metric keys and the buffer-observer bridge.

use std::sync::Arc;

use rowferry_core::BufferObserver;

use crate::stats::Stats;

/// Gauge: current buffer byte footprint, tagged by collection.
pub const METRIC_BUFFER_SIZE_BYTES: &str = "buffer.size.bytes";

/// Gauge: current buffer row count, tagged by collection.
pub const METRIC_BUFFER_LENGTH_ROWS: &str = "buffer.length.rows";

/// Counter: rows written into the buffer cumulatively, tagged by
/// collection.
pub const METRIC_BUFFER_TOTAL_WRITE_LENGTH_ROWS: &str = "buffer.totalWriteLength.rows";

/// Counter: rows read out of the buffer cumulatively, tagged by
/// collection.
pub const METRIC_BUFFER_TOTAL_READ_LENGTH_ROWS: &str = "buffer.totalReadLength.rows";

/// Registers the pipeline's metrics into `stats`.
pub fn register_pipeline_metrics(stats: &Stats) {
    stats.register_gauge(METRIC_BUFFER_SIZE_BYTES, "buffer size in bytes");
    stats.register_gauge(METRIC_BUFFER_LENGTH_ROWS, "buffer size in rows");
    stats.register_counter(
        METRIC_BUFFER_TOTAL_WRITE_LENGTH_ROWS,
        "total buffer writes in rows",
    );
    stats.register_counter(
        METRIC_BUFFER_TOTAL_READ_LENGTH_ROWS,
        "total buffer reads in rows",
    );
}

/// Bridges one buffer's notifications into the stats registry, tagged
/// with the collection name.
pub struct BufferObserverAdapter {
    stats: Arc<Stats>,
    collection: String,
}

impl BufferObserverAdapter {
    /// Creates the adapter and zeroes the collection's gauges.
    #[must_use]
    pub fn new(stats: Arc<Stats>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        stats.set(METRIC_BUFFER_SIZE_BYTES, &collection, 0);
        stats.set(METRIC_BUFFER_LENGTH_ROWS, &collection, 0);
        Self { stats, collection }
    }
}

impl BufferObserver for BufferObserverAdapter {
    fn size_changed(&self, bytes: u64) {
        self.stats.set(
            METRIC_BUFFER_SIZE_BYTES,
            &self.collection,
            i64::try_from(bytes).unwrap_or(i64::MAX),
        );
    }

    fn length_changed(&self, rows: u64) {
        self.stats.set(
            METRIC_BUFFER_LENGTH_ROWS,
            &self.collection,
            i64::try_from(rows).unwrap_or(i64::MAX),
        );
    }

    fn rows_written(&self, rows: usize) {
        self.stats.add(
            METRIC_BUFFER_TOTAL_WRITE_LENGTH_ROWS,
            &self.collection,
            i64::try_from(rows).unwrap_or(i64::MAX),
        );
    }

    fn rows_read(&self, rows: usize) {
        self.stats.add(
            METRIC_BUFFER_TOTAL_READ_LENGTH_ROWS,
            &self.collection,
            i64::try_from(rows).unwrap_or(i64::MAX),
        );
    }
}
