//! # `rowferry`
//!
//! Streaming migration of tabular data between heterogeneous databases.
//!
//! For each selected collection the pipeline couples a work-partitioned
//! reader to a pool of batch-assembling writers through one bounded
//! buffer:
//!
//! ```text
//!  source driver ── connector ── pool ──► reader workers ──┐
//!                                                          ▼
//!                                                   bounded buffer
//!                                                          ▼
//!  dest driver ──── connector ── pool ──► writer workers ──┘
//!                                                          │
//!                                                   metrics observer
//! ```
//!
//! The [`Migration`] builder is the entry point:
//!
//! ```rust,ignore
//! rowferry_connectors::register_builtin_drivers();
//! let migration = Migration::new()
//!     .source("mysql", "root:root@localhost:3306/shop")?
//!     .dest("cockroach", "root@localhost:26257/shop")?
//!     .filter_all("tenant_id", Operator::Eq, "7")
//!     .workers(4);
//! migration.start().await?;
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Work-partitioned source-side streaming.
pub mod reader;

/// Destination-side worker pool.
pub mod writer;

/// Per-collection orchestration and the builder surface.
pub mod migration;

/// Metric keys and the buffer-observer bridge.
pub mod metrics;

/// Named gauge/counter registry with per-collection tags.
pub mod stats;

/// Pipeline errors.
pub mod error;

pub use error::MigrationError;
pub use migration::{CollectionState, Migration};
pub use reader::Reader;
pub use stats::{MetricKind, Stats};
pub use writer::Writer;

/// Default rows per read/write batch.
pub const DEFAULT_ROWS_PER_BATCH: u64 = 100;

/// Default worker parallelism per reader/writer.
pub const DEFAULT_WORKERS: u32 = 3;

/// Default buffer byte cap (256 MiB).
pub const DEFAULT_BUFFER_MAX_SIZE: u64 = 256 * 1024 * 1024;

/// Default buffer row cap.
pub const DEFAULT_BUFFER_MAX_LENGTH: u64 = 100_000;
