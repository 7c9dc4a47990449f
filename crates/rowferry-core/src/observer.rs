//! Buffer observation.

/// Hook notified about buffer traffic.
///
/// The buffer calls these outside its internal lock, after the
/// corresponding operation committed. Implementations must not block;
/// they feed gauges and counters, not control flow.
pub trait BufferObserver: Send + Sync {
    /// The buffer's byte footprint changed to `bytes`.
    fn size_changed(&self, bytes: u64);

    /// The buffer's row count changed to `rows`.
    fn length_changed(&self, rows: u64);

    /// `rows` rows were written into the buffer.
    fn rows_written(&self, rows: usize);

    /// `rows` rows were read out of the buffer.
    fn rows_read(&self, rows: usize);
}
