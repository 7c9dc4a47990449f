//! # `rowferry` Connectors
//!
//! The pluggable database layer of the migration pipeline: the driver
//! and connection capability contract, the process-wide driver registry,
//! filter/sort configuration, connectors and connection pools, and the
//! concrete drivers.
//!
//! A [`Driver`](driver::Driver) mints [`Connection`](driver::Connection)s
//! from a DSN. Connections always support introspection; reading,
//! writing, filtering, and sorting are optional capabilities surfaced
//! through `as_*` casts. A [`Connector`](connector::Connector) binds a
//! driver to a DSN plus filter/sort state and replays that state onto
//! every connection it opens; a [`ConnectionPool`](pool::ConnectionPool)
//! owns the connections a reader's or writer's workers check out.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Driver and connection traits, capability contract, database details.
pub mod driver;

/// Process-wide driver registry.
pub mod registry;

/// Conjunctive predicate configuration.
pub mod filter;

/// Ordering configuration.
pub mod sort;

/// Driver + DSN + query configuration, minting connections.
pub mod connector;

/// Index-addressed connection pool.
pub mod pool;

/// Destination-side batch projection and conversion.
pub mod write_plan;

/// MySQL source driver.
pub mod mysql;

/// CockroachDB destination driver.
pub mod cockroach;

/// In-memory driver for tests and tooling.
pub mod testing;

/// Error taxonomy of the connector layer.
pub mod error;

pub use connector::Connector;
pub use driver::{
    Connection, DataCollectionDetail, DatabaseDetail, Driver, FilterableConnection,
    ReadableConnection, SortableConnection, WritableConnection,
};
pub use error::ConnectorError;
pub use filter::{Filter, FilterBuilder, Operator};
pub use pool::{ConnectionPool, SharedConnection};
pub use registry::{global, register_builtin_drivers, DriverRegistry};
pub use sort::{Direction, Sort, SortBuilder};
