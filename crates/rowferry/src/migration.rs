//! The migration controller.
//!
//! [`Migration`] is the builder-style entry point: pick a source and a
//! destination driver, accumulate filters, ordering, collection
//! selection, offsets, and parallelism, then [`Migration::start`] runs
//! every selected collection's reader/writer pair to completion.
//!
//! Control flow is one-way: cancellation originates here and propagates
//! through the per-collection buffers to readers, writers, and any
//! blocked buffer operation. The first fatal error cancels the run and
//! is returned once every sibling has drained; [`Migration::stop`]
//! cancels with a recorded stop cause that `start` reports as a clean
//! return.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use rowferry_core::Buffer;
use rowferry_connectors::{
    registry, Connector, ConnectionPool, ConnectorError, DatabaseDetail, Driver, Filter,
    FilterBuilder, Operator, Sort, SortBuilder,
};

use crate::error::MigrationError;
use crate::metrics::{register_pipeline_metrics, BufferObserverAdapter};
use crate::reader::Reader;
use crate::stats::Stats;
use crate::writer::Writer;
use crate::{
    DEFAULT_BUFFER_MAX_LENGTH, DEFAULT_BUFFER_MAX_SIZE, DEFAULT_ROWS_PER_BATCH, DEFAULT_WORKERS,
};

/// Lifecycle of one collection's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// Selected, tasks not yet spawned.
    Pending,
    /// Reader and writer running.
    Running,
    /// Reader exited and closed the buffer; writer draining.
    ReaderDone,
    /// Writer drained and exited.
    Done,
    /// Cancelled before completion.
    Cancelled,
    /// A fatal error stopped the collection.
    Failed,
}

impl fmt::Display for CollectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CollectionState::Pending => "pending",
            CollectionState::Running => "running",
            CollectionState::ReaderDone => "reader-done",
            CollectionState::Done => "done",
            CollectionState::Cancelled => "cancelled",
            CollectionState::Failed => "failed",
        };
        f.write_str(s)
    }
}

struct Endpoint {
    driver: Arc<dyn Driver>,
    dsn: String,
}

/// Builder-style migration controller.
pub struct Migration {
    source: Option<Endpoint>,
    dest: Option<Endpoint>,
    filters: FilterBuilder,
    sorts: SortBuilder,
    include: Vec<String>,
    exclude: Vec<String>,
    start_offsets: HashMap<String, u64>,
    end_offsets: HashMap<String, u64>,
    rows_per_batch: u64,
    workers: u32,
    buffer_max_size: u64,
    buffer_max_length: u64,
    stats: Arc<Stats>,
    states: Arc<RwLock<HashMap<String, CollectionState>>>,
    cancel: CancellationToken,
    cause: Arc<Mutex<Option<MigrationError>>>,
}

impl Default for Migration {
    fn default() -> Self {
        Self::new()
    }
}

impl Migration {
    /// Creates a migration with default batch size, worker count, and
    /// buffer caps.
    #[must_use]
    pub fn new() -> Self {
        let stats = Arc::new(Stats::new());
        register_pipeline_metrics(&stats);
        Self {
            source: None,
            dest: None,
            filters: FilterBuilder::new(),
            sorts: SortBuilder::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            start_offsets: HashMap::new(),
            end_offsets: HashMap::new(),
            rows_per_batch: DEFAULT_ROWS_PER_BATCH,
            workers: DEFAULT_WORKERS,
            buffer_max_size: DEFAULT_BUFFER_MAX_SIZE,
            buffer_max_length: DEFAULT_BUFFER_MAX_LENGTH,
            stats,
            states: Arc::new(RwLock::new(HashMap::new())),
            cancel: CancellationToken::new(),
            cause: Arc::new(Mutex::new(None)),
        }
    }

    /// Selects the source driver and DSN.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DriverNotFound`] for unknown driver names,
    /// [`ConnectorError::NotReadable`] for drivers that cannot read.
    pub fn source(mut self, driver: &str, dsn: &str) -> Result<Self, MigrationError> {
        let driver = registry::global().get(driver)?;
        if !driver.is_readable() {
            return Err(ConnectorError::NotReadable(driver.name().to_owned()).into());
        }
        self.source = Some(Endpoint {
            driver,
            dsn: dsn.to_owned(),
        });
        Ok(self)
    }

    /// Selects the destination driver and DSN.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::DriverNotFound`] for unknown driver names,
    /// [`ConnectorError::NotWritable`] for drivers that cannot write.
    pub fn dest(mut self, driver: &str, dsn: &str) -> Result<Self, MigrationError> {
        let driver = registry::global().get(driver)?;
        if !driver.is_writable() {
            return Err(ConnectorError::NotWritable(driver.name().to_owned()).into());
        }
        self.dest = Some(Endpoint {
            driver,
            dsn: dsn.to_owned(),
        });
        Ok(self)
    }

    /// Adds a conjunctive predicate for one collection.
    #[must_use]
    pub fn filter(mut self, collection: &str, column: &str, op: Operator, literal: &str) -> Self {
        self.filters.push(collection, Filter::new(column, op, literal));
        self
    }

    /// Adds a conjunctive predicate applied to every collection.
    #[must_use]
    pub fn filter_all(mut self, column: &str, op: Operator, literal: &str) -> Self {
        self.filters.push_root(Filter::new(column, op, literal));
        self
    }

    /// Adds an ordering term for one collection.
    #[must_use]
    pub fn order_by(
        mut self,
        collection: &str,
        column: &str,
        direction: rowferry_connectors::Direction,
    ) -> Self {
        self.sorts.push(collection, Sort::new(column, direction));
        self
    }

    /// Adds an ordering term applied to every collection.
    #[must_use]
    pub fn order_by_all(mut self, column: &str, direction: rowferry_connectors::Direction) -> Self {
        self.sorts.push_root(Sort::new(column, direction));
        self
    }

    /// Restricts the migration to the listed collections.
    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(names.into_iter().map(Into::into));
        self
    }

    /// Omits the listed collections.
    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Bounds one collection's row range from below (inclusive).
    #[must_use]
    pub fn set_start_offset(mut self, collection: &str, offset: u64) -> Self {
        self.start_offsets.insert(collection.to_owned(), offset);
        self
    }

    /// Bounds one collection's row range from above (exclusive).
    #[must_use]
    pub fn set_end_offset(mut self, collection: &str, offset: u64) -> Self {
        self.end_offsets.insert(collection.to_owned(), offset);
        self
    }

    /// Sets the global batch size.
    #[must_use]
    pub fn rows_per_batch(mut self, rows: u64) -> Self {
        self.rows_per_batch = rows.max(1);
        self
    }

    /// Sets the global reader/writer parallelism.
    #[must_use]
    pub fn workers(mut self, workers: u32) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Sets each collection buffer's byte cap.
    #[must_use]
    pub fn buffer_max_size(mut self, bytes: u64) -> Self {
        self.buffer_max_size = bytes.max(1);
        self
    }

    /// Sets each collection buffer's row cap.
    #[must_use]
    pub fn buffer_max_length(mut self, rows: u64) -> Self {
        self.buffer_max_length = rows.max(1);
        self
    }

    /// The migration's metric registry.
    #[must_use]
    pub fn stats(&self) -> Arc<Stats> {
        Arc::clone(&self.stats)
    }

    /// Snapshot of every selected collection's pipeline state.
    #[must_use]
    pub fn states(&self) -> HashMap<String, CollectionState> {
        self.states.read().clone()
    }

    /// Cancels the run. `start` observes the stop cause and returns
    /// cleanly once every collection has drained.
    pub fn stop(&self) {
        self.cause
            .lock()
            .get_or_insert(MigrationError::StopFuncCalled);
        self.cancel.cancel();
    }

    /// Introspects the source without running a migration. Used by
    /// callers that need collection names and row counts up front.
    ///
    /// # Errors
    ///
    /// [`MigrationError::SrcConnectionRequired`] before [`Migration::source`],
    /// or connection/introspection errors.
    pub async fn source_details(&self) -> Result<DatabaseDetail, MigrationError> {
        let endpoint = self
            .source
            .as_ref()
            .ok_or(MigrationError::SrcConnectionRequired)?;
        let connector = Connector::new(Arc::clone(&endpoint.driver), endpoint.dsn.clone())
            .with_filters(self.filters.clone())
            .with_sorts(self.sorts.clone());
        let mut conn = connector.connect().await?;
        let details = conn.get_details().await?;
        conn.close().await?;
        Ok(details)
    }

    /// Runs the migration: introspects both ends, spawns a reader and a
    /// writer per selected collection, and returns when every
    /// collection has drained, failed, or been cancelled.
    ///
    /// # Errors
    ///
    /// Configuration errors synchronously; otherwise the first fatal
    /// error observed across collections. A [`Migration::stop`] call is
    /// not an error.
    pub async fn start(&self) -> Result<(), MigrationError> {
        let source = self
            .source
            .as_ref()
            .ok_or(MigrationError::SrcConnectionRequired)?;
        let dest = self
            .dest
            .as_ref()
            .ok_or(MigrationError::DestConnectionRequired)?;

        let src_connector = Arc::new(
            Connector::new(Arc::clone(&source.driver), source.dsn.clone())
                .with_filters(self.filters.clone())
                .with_sorts(self.sorts.clone()),
        );
        let dest_connector = Arc::new(Connector::new(Arc::clone(&dest.driver), dest.dsn.clone()));

        // Source introspection drives collection selection; destination
        // introspection fails fast on unreachable targets.
        let mut src_conn = src_connector.connect().await?;
        let src_details = src_conn.get_details().await?;
        src_conn.close().await?;

        let mut dest_conn = dest_connector.connect().await?;
        let dest_details = dest_conn.get_details().await?;
        dest_conn.close().await?;
        tracing::debug!(
            source = %src_details.name,
            dest = %dest_details.name,
            collections = dest_details.collections.len(),
            "destination reachable"
        );

        let mut collections = src_details.collections.clone();
        if !self.include.is_empty() {
            collections = src_details.only(&self.include);
        }
        if !self.exclude.is_empty() {
            collections.retain(|c| !self.exclude.contains(&c.name));
        }

        let mut runs = Vec::new();
        for detail in collections {
            if detail.expected_row_count == 0 {
                tracing::info!(collection = %detail.name, "skipping empty collection");
                continue;
            }
            self.states
                .write()
                .insert(detail.name.clone(), CollectionState::Pending);

            let observer = Arc::new(BufferObserverAdapter::new(
                Arc::clone(&self.stats),
                detail.name.clone(),
            ));
            let buffer = Arc::new(
                Buffer::new(self.cancel.clone())
                    .with_max_size(self.buffer_max_size)
                    .with_max_length(self.buffer_max_length)
                    .with_observer(observer),
            );

            let src_pool = Arc::new(ConnectionPool::new(Arc::clone(&src_connector)));
            let dest_pool = Arc::new(ConnectionPool::new(Arc::clone(&dest_connector)));

            let mut reader = Reader::new(
                self.cancel.clone(),
                detail.name.clone(),
                Arc::clone(&buffer),
                detail.schema.clone(),
                src_pool,
            );
            reader.set_rows_per_batch(self.rows_per_batch);
            reader.set_workers(self.workers);
            reader.set_start_offset(*self.start_offsets.get(&detail.name).unwrap_or(&0));
            reader.set_end_offset(
                *self
                    .end_offsets
                    .get(&detail.name)
                    .unwrap_or(&detail.expected_row_count),
            );

            let mut writer = Writer::new(
                self.cancel.clone(),
                detail.name.clone(),
                buffer,
                dest_pool,
            );
            writer.set_rows_per_batch(self.rows_per_batch);
            writer.set_workers(self.workers);

            self.set_state(&detail.name, CollectionState::Running);
            tracing::info!(
                collection = %detail.name,
                rows = detail.expected_row_count,
                workers = self.workers,
                "collection migration started"
            );

            let reader_handle = tokio::spawn(async move { reader.start().await });
            let writer_handle = tokio::spawn(async move { writer.start().await });
            runs.push((detail.name, reader_handle, writer_handle));
        }

        for (name, reader_handle, writer_handle) in runs {
            match reader_handle.await {
                Ok(Ok(())) => {
                    self.advance_state(&name, CollectionState::Running, CollectionState::ReaderDone);
                }
                Ok(Err(e)) => self.fail(&name, e),
                Err(join_err) if join_err.is_panic() => {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                Err(_) => {}
            }
            match writer_handle.await {
                Ok(Ok(())) => {
                    self.advance_state(&name, CollectionState::ReaderDone, CollectionState::Done);
                    self.advance_state(&name, CollectionState::Running, CollectionState::Done);
                }
                Ok(Err(e)) => self.fail(&name, e),
                Err(join_err) if join_err.is_panic() => {
                    std::panic::resume_unwind(join_err.into_panic());
                }
                Err(_) => {}
            }
        }

        if self.cancel.is_cancelled() {
            let mut states = self.states.write();
            for state in states.values_mut() {
                if !matches!(
                    state,
                    CollectionState::Done | CollectionState::Failed
                ) {
                    *state = CollectionState::Cancelled;
                }
            }
        }

        match self.cause.lock().take() {
            None | Some(MigrationError::StopFuncCalled) => Ok(()),
            Some(err) => Err(err),
        }
    }

    fn set_state(&self, name: &str, state: CollectionState) {
        self.states.write().insert(name.to_owned(), state);
    }

    fn advance_state(&self, name: &str, from: CollectionState, to: CollectionState) {
        let mut states = self.states.write();
        if states.get(name) == Some(&from) {
            states.insert(name.to_owned(), to);
        }
    }

    /// Records the first fatal error as the cancellation cause and
    /// cancels the run.
    fn fail(&self, name: &str, err: MigrationError) {
        tracing::error!(collection = %name, error = %err, "collection migration failed");
        self.set_state(name, CollectionState::Failed);
        self.cause.lock().get_or_insert(err);
        self.cancel.cancel();
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("source", &self.source.as_ref().map(|e| e.driver.name()))
            .field("dest", &self.dest.as_ref().map(|e| e.driver.name()))
            .field("rows_per_batch", &self.rows_per_batch)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_requires_endpoints() {
        let migration = Migration::new();
        let err = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(migration.start())
            .unwrap_err();
        assert!(matches!(err, MigrationError::SrcConnectionRequired));
    }

    #[test]
    fn test_unknown_driver_rejected() {
        rowferry_connectors::register_builtin_drivers();
        let err = Migration::new().source("no-such-driver", "").unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Connector(ConnectorError::DriverNotFound(_))
        ));
    }

    #[test]
    fn test_capability_mismatch_rejected() {
        rowferry_connectors::register_builtin_drivers();
        // cockroach cannot read; mysql cannot write.
        assert!(matches!(
            Migration::new().source("cockroach", "").unwrap_err(),
            MigrationError::Connector(ConnectorError::NotReadable(_))
        ));
        assert!(matches!(
            Migration::new().dest("mysql", "").unwrap_err(),
            MigrationError::Connector(ConnectorError::NotWritable(_))
        ));
    }

    #[test]
    fn test_stop_records_cause() {
        let migration = Migration::new();
        migration.stop();
        assert!(migration.cancel.is_cancelled());
        assert!(matches!(
            *migration.cause.lock(),
            Some(MigrationError::StopFuncCalled)
        ));
    }
}
