//! Metric registry.
//!
//! A small real-time registry of named gauges and counters, each cell
//! tagged (by collection name in this pipeline). Cells are plain atomics
//! so the hot path never takes the registry lock for more than a map
//! read; consumers poll snapshots.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// What a metric's value means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// Point-in-time value, set absolutely.
    Gauge,
    /// Monotonically accumulated value.
    Counter,
}

struct Metric {
    kind: MetricKind,
    help: String,
    cells: HashMap<String, Arc<AtomicI64>>,
}

/// Named gauge/counter registry with tagged cells.
///
/// Unregistered metric names are ignored by the write paths; the
/// observer side of the pipeline must never fail or block on
/// bookkeeping.
#[derive(Default)]
pub struct Stats {
    metrics: RwLock<HashMap<String, Metric>>,
}

impl Stats {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gauge. Re-registering a name is a no-op.
    pub fn register_gauge(&self, name: &str, help: &str) {
        self.register(name, help, MetricKind::Gauge);
    }

    /// Registers a counter. Re-registering a name is a no-op.
    pub fn register_counter(&self, name: &str, help: &str) {
        self.register(name, help, MetricKind::Counter);
    }

    fn register(&self, name: &str, help: &str, kind: MetricKind) {
        self.metrics
            .write()
            .entry(name.to_owned())
            .or_insert_with(|| Metric {
                kind,
                help: help.to_owned(),
                cells: HashMap::new(),
            });
    }

    fn cell(&self, name: &str, tag: &str) -> Option<Arc<AtomicI64>> {
        {
            let metrics = self.metrics.read();
            let metric = metrics.get(name)?;
            if let Some(cell) = metric.cells.get(tag) {
                return Some(Arc::clone(cell));
            }
        }
        let mut metrics = self.metrics.write();
        let metric = metrics.get_mut(name)?;
        Some(Arc::clone(
            metric
                .cells
                .entry(tag.to_owned())
                .or_insert_with(|| Arc::new(AtomicI64::new(0))),
        ))
    }

    /// Stores an absolute value (gauge semantics).
    pub fn set(&self, name: &str, tag: &str, value: i64) {
        if let Some(cell) = self.cell(name, tag) {
            cell.store(value, Ordering::Relaxed);
        }
    }

    /// Adds to the stored value (counter semantics).
    pub fn add(&self, name: &str, tag: &str, delta: i64) {
        if let Some(cell) = self.cell(name, tag) {
            cell.fetch_add(delta, Ordering::Relaxed);
        }
    }

    /// Current value of one cell; zero for unknown names or tags.
    #[must_use]
    pub fn value(&self, name: &str, tag: &str) -> i64 {
        self.metrics
            .read()
            .get(name)
            .and_then(|m| m.cells.get(tag))
            .map_or(0, |cell| cell.load(Ordering::Relaxed))
    }

    /// Snapshot of every tagged cell of one metric.
    #[must_use]
    pub fn snapshot(&self, name: &str) -> HashMap<String, i64> {
        self.metrics.read().get(name).map_or_else(HashMap::new, |m| {
            m.cells
                .iter()
                .map(|(tag, cell)| (tag.clone(), cell.load(Ordering::Relaxed)))
                .collect()
        })
    }

    /// The kind of a registered metric.
    #[must_use]
    pub fn kind(&self, name: &str) -> Option<MetricKind> {
        self.metrics.read().get(name).map(|m| m.kind)
    }

    /// The help text of a registered metric.
    #[must_use]
    pub fn help(&self, name: &str) -> Option<String> {
        self.metrics.read().get(name).map(|m| m.help.clone())
    }

    /// Registered metric names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.read().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_set_and_counter_add() {
        let stats = Stats::new();
        stats.register_gauge("g", "a gauge");
        stats.register_counter("c", "a counter");

        stats.set("g", "users", 5);
        stats.set("g", "users", 3);
        assert_eq!(stats.value("g", "users"), 3);

        stats.add("c", "users", 5);
        stats.add("c", "users", 3);
        assert_eq!(stats.value("c", "users"), 8);
    }

    #[test]
    fn test_unregistered_metric_ignored() {
        let stats = Stats::new();
        stats.set("missing", "t", 1);
        stats.add("missing", "t", 1);
        assert_eq!(stats.value("missing", "t"), 0);
    }

    #[test]
    fn test_tags_are_independent() {
        let stats = Stats::new();
        stats.register_counter("c", "");
        stats.add("c", "a", 1);
        stats.add("c", "b", 2);
        let snap = stats.snapshot("c");
        assert_eq!(snap.get("a"), Some(&1));
        assert_eq!(snap.get("b"), Some(&2));
    }

    #[test]
    fn test_register_is_idempotent() {
        let stats = Stats::new();
        stats.register_counter("c", "first");
        stats.add("c", "t", 7);
        stats.register_counter("c", "second");
        assert_eq!(stats.value("c", "t"), 7);
        assert_eq!(stats.help("c").as_deref(), Some("first"));
    }
}
