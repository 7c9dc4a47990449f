//! Pipeline errors.

use rowferry_core::BufferError;
use rowferry_connectors::ConnectorError;

/// Errors from pipeline configuration and execution.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum MigrationError {
    /// `start` was called without a source.
    #[error("source connection required")]
    SrcConnectionRequired,

    /// `start` was called without a destination.
    #[error("destination connection required")]
    DestConnectionRequired,

    /// The reader has no schema map for its collection.
    #[error("data map not set")]
    DataMapNotSet,

    /// The reader's end offset is unset (zero).
    #[error("end offset required")]
    EndOffsetRequired,

    /// The reader's end offset precedes its start offset.
    #[error("end offset is less than start offset")]
    EndOffsetLessThanStart,

    /// The migration was stopped by its owner. Carried as the
    /// cancellation cause; `start` reports it as a clean return, never
    /// as an error.
    #[error("stop function called")]
    StopFuncCalled,

    /// Driver, connection, or conversion failure.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// Buffer failure outside the ordinary end-of-stream close.
    #[error(transparent)]
    Buffer(#[from] BufferError),
}
