//! Value kinds.
//!
//! A [`Kind`] identifies the shape of a value independently of any
//! particular database engine. Conversions between values are gated by
//! the symmetric [`Kind::compatible_with`] relation.

use std::fmt;

/// The semantic category of a value as seen by the pipeline core.
///
/// The zero value is [`Kind::Unknown`], which is compatible with nothing
/// (including itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum Kind {
    /// Unrecognised or not-yet-typed value.
    #[default]
    Unknown,
    /// UTF-8 text.
    String,
    /// Boolean.
    Bool,
    /// Platform-width signed integer.
    Int,
    /// 8-bit signed integer.
    Int8,
    /// 16-bit signed integer.
    Int16,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// Platform-width unsigned integer.
    Uint,
    /// 8-bit unsigned integer.
    Uint8,
    /// 16-bit unsigned integer.
    Uint16,
    /// 32-bit unsigned integer.
    Uint32,
    /// 64-bit unsigned integer.
    Uint64,
    /// Unsized float.
    Float,
    /// 32-bit float.
    Float32,
    /// 64-bit float.
    Float64,
    /// Raw byte string.
    Bytes,
    /// Calendar time without an offset.
    Time,
    /// Point-in-time with sub-second precision.
    Timestamp,
    /// Elapsed time.
    Duration,
    /// Fixed-length sequence.
    Array,
    /// Key/value mapping.
    Map,
    /// Variable-length sequence.
    Slice,
    /// Composite record.
    Struct,
    /// Indirection to another value.
    Pointer,
    /// Opaque dynamic value.
    Interface,
    /// Callable.
    Func,
    /// Channel.
    Chan,
}

/// Coarse grouping used by the compatibility relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Group {
    Integer,
    Float,
    Stringy,
    Temporal,
    Other,
}

impl Kind {
    /// All kinds, in declaration order.
    pub const ALL: [Kind; 28] = [
        Kind::Unknown,
        Kind::String,
        Kind::Bool,
        Kind::Int,
        Kind::Int8,
        Kind::Int16,
        Kind::Int32,
        Kind::Int64,
        Kind::Uint,
        Kind::Uint8,
        Kind::Uint16,
        Kind::Uint32,
        Kind::Uint64,
        Kind::Float,
        Kind::Float32,
        Kind::Float64,
        Kind::Bytes,
        Kind::Time,
        Kind::Timestamp,
        Kind::Duration,
        Kind::Array,
        Kind::Map,
        Kind::Slice,
        Kind::Struct,
        Kind::Pointer,
        Kind::Interface,
        Kind::Func,
        Kind::Chan,
    ];

    /// Returns the lower-case name of the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Unknown => "unknown",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Int8 => "int8",
            Kind::Int16 => "int16",
            Kind::Int32 => "int32",
            Kind::Int64 => "int64",
            Kind::Uint => "uint",
            Kind::Uint8 => "uint8",
            Kind::Uint16 => "uint16",
            Kind::Uint32 => "uint32",
            Kind::Uint64 => "uint64",
            Kind::Float => "float",
            Kind::Float32 => "float32",
            Kind::Float64 => "float64",
            Kind::Bytes => "bytes",
            Kind::Time => "time",
            Kind::Timestamp => "timestamp",
            Kind::Duration => "duration",
            Kind::Array => "array",
            Kind::Map => "map",
            Kind::Slice => "slice",
            Kind::Struct => "struct",
            Kind::Pointer => "pointer",
            Kind::Interface => "interface",
            Kind::Func => "func",
            Kind::Chan => "chan",
        }
    }

    /// Looks a kind up by its name. Unrecognised names map to
    /// [`Kind::Unknown`].
    #[must_use]
    pub fn from_name(name: &str) -> Kind {
        Kind::ALL
            .into_iter()
            .find(|k| k.as_str() == name)
            .unwrap_or(Kind::Unknown)
    }

    /// Returns the fixed byte-size hint for base kinds.
    ///
    /// The hint feeds the buffer's byte accounting only; it says nothing
    /// about wire layout. Non-base kinds report 0.
    #[must_use]
    pub fn base_size(self) -> u64 {
        match self {
            Kind::String => 4, // widest single UTF-8 scalar
            Kind::Bool | Kind::Int8 | Kind::Uint8 | Kind::Bytes => 1,
            Kind::Int16 | Kind::Uint16 => 2,
            Kind::Int32 | Kind::Uint32 | Kind::Float32 => 4,
            Kind::Int
            | Kind::Int64
            | Kind::Uint
            | Kind::Uint64
            | Kind::Float
            | Kind::Float64
            | Kind::Time
            | Kind::Timestamp
            | Kind::Duration => 8,
            _ => 0,
        }
    }

    /// Reports whether a value of this kind can be converted to `other`.
    ///
    /// The relation is symmetric and reflexive except for
    /// [`Kind::Unknown`], which is compatible with nothing. Integer
    /// widths (signed and unsigned) are mutually compatible, floats are
    /// compatible with each other and with integers, [`Kind::Bytes`]
    /// with [`Kind::String`], and [`Kind::Time`] with
    /// [`Kind::Timestamp`].
    #[must_use]
    pub fn compatible_with(self, other: Kind) -> bool {
        if self == Kind::Unknown || other == Kind::Unknown {
            return false;
        }
        if self == other {
            return true;
        }
        matches!(
            (self.group(), other.group()),
            (Group::Integer | Group::Float, Group::Integer | Group::Float)
                | (Group::Stringy, Group::Stringy)
                | (Group::Temporal, Group::Temporal)
        )
    }

    fn group(self) -> Group {
        match self {
            Kind::Int
            | Kind::Int8
            | Kind::Int16
            | Kind::Int32
            | Kind::Int64
            | Kind::Uint
            | Kind::Uint8
            | Kind::Uint16
            | Kind::Uint32
            | Kind::Uint64 => Group::Integer,
            Kind::Float | Kind::Float32 | Kind::Float64 => Group::Float,
            Kind::String | Kind::Bytes => Group::Stringy,
            Kind::Time | Kind::Timestamp => Group::Temporal,
            _ => Group::Other,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for kind in Kind::ALL {
            assert_eq!(Kind::from_name(kind.as_str()), kind);
        }
        assert_eq!(Kind::from_name("no-such-kind"), Kind::Unknown);
    }

    #[test]
    fn test_unknown_compatible_with_nothing() {
        for kind in Kind::ALL {
            assert!(!Kind::Unknown.compatible_with(kind));
            assert!(!kind.compatible_with(Kind::Unknown));
        }
    }

    #[test]
    fn test_reflexive_except_unknown() {
        for kind in Kind::ALL {
            if kind != Kind::Unknown {
                assert!(kind.compatible_with(kind), "{kind} should self-match");
            }
        }
    }

    #[test]
    fn test_symmetric() {
        for a in Kind::ALL {
            for b in Kind::ALL {
                assert_eq!(
                    a.compatible_with(b),
                    b.compatible_with(a),
                    "asymmetry between {a} and {b}"
                );
            }
        }
    }

    #[test]
    fn test_integer_widths_mutually_compatible() {
        let ints = [
            Kind::Int,
            Kind::Int8,
            Kind::Int16,
            Kind::Int32,
            Kind::Int64,
            Kind::Uint,
            Kind::Uint8,
            Kind::Uint16,
            Kind::Uint32,
            Kind::Uint64,
        ];
        for a in ints {
            for b in ints {
                assert!(a.compatible_with(b));
            }
        }
    }

    #[test]
    fn test_floats_compatible_with_integers() {
        assert!(Kind::Float64.compatible_with(Kind::Int32));
        assert!(Kind::Int8.compatible_with(Kind::Float32));
        assert!(Kind::Float32.compatible_with(Kind::Float64));
    }

    #[test]
    fn test_stringy_and_temporal_groups() {
        assert!(Kind::Bytes.compatible_with(Kind::String));
        assert!(Kind::Time.compatible_with(Kind::Timestamp));
        assert!(!Kind::String.compatible_with(Kind::Int64));
        assert!(!Kind::Timestamp.compatible_with(Kind::Int64));
        assert!(!Kind::Bool.compatible_with(Kind::Int8));
    }

    #[test]
    fn test_base_sizes() {
        assert_eq!(Kind::Int64.base_size(), 8);
        assert_eq!(Kind::Int16.base_size(), 2);
        assert_eq!(Kind::Bool.base_size(), 1);
        assert_eq!(Kind::Struct.base_size(), 0);
    }
}
