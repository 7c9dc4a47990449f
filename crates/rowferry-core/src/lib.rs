//! # `rowferry` Core
//!
//! Engine-independent data model and flow control for the rowferry
//! migration pipeline: value kinds, typed value containers, ordered
//! schema maps, rows and batches, and the bounded buffer that couples
//! readers to writers with backpressure.
//!
//! Nothing in this crate knows about any particular database. Drivers
//! export [`TypeInfo`] descriptors and leaf [`Value`] implementations;
//! the pipeline moves rows of those values through a [`Buffer`].

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Value kinds and the kind-compatibility relation.
pub mod kind;

/// Raw datum transport between drivers and value containers.
pub mod datum;

/// The typed value container and static type descriptors.
pub mod value;

/// Generic value implementations not tied to any database engine.
pub mod types;

/// Ordered column-name → type mapping for one collection.
pub mod schema;

/// A single row of named values.
pub mod row;

/// An ordered sequence of rows carried across the pipeline.
pub mod batch;

/// The bounded producer/consumer buffer.
pub mod buffer;

/// Observer hook for buffer traffic.
pub mod observer;

/// Error types for the data model and the buffer.
pub mod error;

pub use batch::Batch;
pub use buffer::Buffer;
pub use datum::Datum;
pub use error::{BufferError, ValueError};
pub use kind::Kind;
pub use observer::BufferObserver;
pub use row::{Field, Row};
pub use schema::{Column, SchemaMap};
pub use value::{TypeInfo, Value};
