//! Connector-layer errors.

use rowferry_core::ValueError;

/// Errors from drivers, connections, pools, and the registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConnectorError {
    /// No driver registered under the requested name.
    #[error("driver not found: {0}")]
    DriverNotFound(String),

    /// The driver cannot act as a source.
    #[error("connection is not readable: {0}")]
    NotReadable(String),

    /// The driver cannot act as a destination.
    #[error("connection is not writable: {0}")]
    NotWritable(String),

    /// The connection (or pool slot) has been closed.
    #[error("connection is closed")]
    ConnectionIsClosed,

    /// A pool index beyond the slot vector was used.
    #[error("connection pool index {index} out of range (len {len})")]
    PoolOutOfIndex {
        /// The requested slot index.
        index: usize,
        /// The pool's slot count.
        len: usize,
    },

    /// The DSN could not be parsed.
    #[error("invalid dsn: {0}")]
    InvalidDsn(String),

    /// A native column type the driver does not know.
    #[error("type not found: {0}")]
    TypeNotFound(String),

    /// The destination rejected a row as a duplicate (unique violation).
    #[error("data set already exists on the destination: {0}")]
    DataSetDuplicate(String),

    /// A destination column that accepts no nulls and has no default is
    /// missing from an incoming row.
    #[error("column '{0}' is required by the destination but missing from the row")]
    RequiredColumnMissing(String),

    /// A value failed to parse or convert.
    #[error(transparent)]
    Value(#[from] ValueError),

    /// MySQL client error.
    #[error("mysql: {0}")]
    MySql(#[from] mysql_async::Error),

    /// Postgres client error.
    #[error("postgres: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Any other driver-specific failure.
    #[error("{0}")]
    Other(String),
}
