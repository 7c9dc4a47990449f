//! Error types for the data model and the buffer.

use crate::kind::Kind;

/// Errors from parsing, converting, or assigning values.
#[derive(Debug, thiserror::Error)]
pub enum ValueError {
    /// The leaf type does not implement `parse`.
    #[error("parse function not implemented")]
    ParseNotImplemented,

    /// A raw datum of an unacceptable shape was passed to `parse`.
    #[error("invalid value: expected {expected}, got {got}")]
    Invalid {
        /// What the value type accepts.
        expected: &'static str,
        /// What it was handed instead.
        got: String,
    },

    /// Conversion between kind-incompatible types was requested.
    #[error("data type kind not match: {from} is not compatible with {to}")]
    KindNotMatch {
        /// Kind of the source value.
        from: Kind,
        /// Kind of the requested target.
        to: Kind,
    },

    /// The destination slot passed to `assign_to` cannot hold a value of
    /// this kind.
    #[error("destination is not assignable from {kind}")]
    NotAssignable {
        /// Kind of the value being assigned.
        kind: Kind,
    },
}

impl ValueError {
    /// Shorthand for [`ValueError::Invalid`].
    #[must_use]
    pub fn invalid(expected: &'static str, got: &crate::datum::Datum) -> Self {
        ValueError::Invalid {
            expected,
            got: format!("{:?}", got.kind()),
        }
    }
}

/// Errors from the bounded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    /// Write after close, or read from a closed and drained buffer.
    #[error("buffer is closed")]
    Closed,

    /// A second call to `close`.
    #[error("buffer already is closed")]
    AlreadyClosed,
}
