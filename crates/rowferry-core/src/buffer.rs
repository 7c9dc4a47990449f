//! The bounded buffer.
//!
//! One buffer sits between the reader and the writer of each collection
//! and is their sole synchronisation point. Writers block while either
//! the byte cap or the row cap would be exceeded; readers block while
//! the buffer is empty and still open. Closing is the end-of-stream
//! signal: a closed buffer rejects writes immediately and rejects reads
//! once drained.
//!
//! Blocking is cooperative: waiters park on a [`Notify`] and are woken
//! by the state changes that could unblock them, so there is no
//! spinning. The buffer is bound to a [`CancellationToken`]; once the
//! token fires the buffer closes itself and every blocked operation
//! resolves under the close rules above.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::batch::Batch;
use crate::error::BufferError;
use crate::observer::BufferObserver;
use crate::row::Row;

#[derive(Debug)]
struct State {
    batch: Batch,
    bytes: u64,
    max_size: u64,
    max_length: u64,
    closed: bool,
}

/// Bounded, thread-safe FIFO of rows with byte and row caps.
pub struct Buffer {
    state: Mutex<State>,
    readable: Notify,
    writable: Notify,
    observer: Option<Arc<dyn BufferObserver>>,
    cancel: CancellationToken,
}

impl Buffer {
    /// Creates an open buffer bound to `cancel`, with both caps
    /// unlimited and no observer.
    #[must_use]
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            state: Mutex::new(State {
                batch: Batch::new(),
                bytes: 0,
                max_size: u64::MAX,
                max_length: u64::MAX,
                closed: false,
            }),
            readable: Notify::new(),
            writable: Notify::new(),
            observer: None,
            cancel,
        }
    }

    /// Sets the byte cap at construction time.
    #[must_use]
    pub fn with_max_size(self, bytes: u64) -> Self {
        self.set_size(bytes);
        self
    }

    /// Sets the row cap at construction time.
    #[must_use]
    pub fn with_max_length(self, rows: u64) -> Self {
        self.set_length(rows);
        self
    }

    /// Attaches the observer. A buffer without an observer is valid.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn BufferObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Changes the byte cap while live, waking blocked writers.
    pub fn set_size(&self, bytes: u64) {
        self.state.lock().max_size = bytes;
        self.writable.notify_waiters();
    }

    /// Changes the row cap while live, waking blocked writers.
    pub fn set_length(&self, rows: u64) {
        self.state.lock().max_length = rows;
        self.writable.notify_waiters();
    }

    /// Appends `rows` to the buffer, in order.
    ///
    /// Blocks until both caps admit the whole write or the buffer
    /// closes. A write larger than the caps themselves is admitted when
    /// the buffer is empty, so one oversized batch cannot stall the
    /// pipeline forever.
    ///
    /// # Errors
    ///
    /// [`BufferError::Closed`] when the buffer is closed before the
    /// write commits, including closure by cancellation while blocked.
    pub async fn write(&self, rows: Vec<Row>) -> Result<(), BufferError> {
        if rows.is_empty() {
            return if self.is_closed() {
                Err(BufferError::Closed)
            } else {
                Ok(())
            };
        }
        let incoming_rows = rows.len() as u64;
        let incoming_bytes: u64 = rows.iter().map(Row::size).sum();
        let mut rows = Some(rows);

        loop {
            if self.cancel.is_cancelled() {
                self.close_internal();
            }
            // Register interest before inspecting state so a wake-up
            // between the check and the await cannot be lost.
            let unblocked = self.writable.notified();
            tokio::pin!(unblocked);
            unblocked.as_mut().enable();
            let committed = {
                let mut state = self.state.lock();
                if state.closed {
                    return Err(BufferError::Closed);
                }
                let fits = state.batch.len() as u64 + incoming_rows <= state.max_length
                    && state.bytes + incoming_bytes <= state.max_size;
                if fits || state.batch.is_empty() {
                    if let Some(rows) = rows.take() {
                        state.batch.add_all(rows);
                    }
                    state.bytes += incoming_bytes;
                    Some((state.bytes, state.batch.len() as u64))
                } else {
                    None
                }
            };
            if let Some((bytes, length)) = committed {
                self.readable.notify_waiters();
                if let Some(obs) = &self.observer {
                    #[allow(clippy::cast_possible_truncation)]
                    obs.rows_written(incoming_rows as usize);
                    obs.length_changed(length);
                    obs.size_changed(bytes);
                }
                return Ok(());
            }
            tokio::select! {
                () = unblocked => {}
                () = self.cancel.cancelled() => {
                    self.close_internal();
                    return Err(BufferError::Closed);
                }
            }
        }
    }

    /// Removes and returns the front row.
    ///
    /// Blocks until a row is available or the buffer is both closed and
    /// empty.
    ///
    /// # Errors
    ///
    /// [`BufferError::Closed`] when the buffer is closed and drained.
    pub async fn read(&self) -> Result<Row, BufferError> {
        loop {
            if self.cancel.is_cancelled() {
                self.close_internal();
            }
            let unblocked = self.readable.notified();
            tokio::pin!(unblocked);
            unblocked.as_mut().enable();
            let popped = {
                let mut state = self.state.lock();
                match state.batch.pop() {
                    Some(row) => {
                        state.bytes = state.bytes.saturating_sub(row.size());
                        Some((row, state.bytes, state.batch.len() as u64))
                    }
                    None if state.closed => return Err(BufferError::Closed),
                    None => None,
                }
            };
            if let Some((row, bytes, length)) = popped {
                self.writable.notify_waiters();
                if let Some(obs) = &self.observer {
                    obs.rows_read(1);
                    obs.length_changed(length);
                    obs.size_changed(bytes);
                }
                return Ok(row);
            }
            tokio::select! {
                () = unblocked => {}
                () = self.cancel.cancelled() => {
                    self.close_internal();
                }
            }
        }
    }

    /// Closes the buffer, waking every blocked reader and writer.
    ///
    /// # Errors
    ///
    /// [`BufferError::AlreadyClosed`] on the second and later calls.
    pub fn close(&self) -> Result<(), BufferError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(BufferError::AlreadyClosed);
            }
            state.closed = true;
        }
        self.readable.notify_waiters();
        self.writable.notify_waiters();
        Ok(())
    }

    fn close_internal(&self) {
        let _ = self.close();
    }

    /// Current byte footprint.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.state.lock().bytes
    }

    /// Current row count.
    #[must_use]
    pub fn length(&self) -> u64 {
        self.state.lock().batch.len() as u64
    }

    /// Reports whether the buffer holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.lock().batch.is_empty()
    }

    /// Reports whether the buffer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        if self.cancel.is_cancelled() {
            self.close_internal();
        }
        self.state.lock().closed
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Buffer")
            .field("length", &state.batch.len())
            .field("bytes", &state.bytes)
            .field("max_size", &state.max_size)
            .field("max_length", &state.max_length)
            .field("closed", &state.closed)
            .finish()
    }
}
