//! Raw datum transport.
//!
//! A [`Datum`] is the engine-neutral carrier a driver hands to
//! [`Value::parse`](crate::value::Value::parse): whatever the native
//! client produced, lowered onto a closed set of variants. It also comes
//! back out of [`Value::get`](crate::value::Value::get), which is how
//! conversions and destination writes observe a value.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::kind::Kind;

/// One raw value as produced by a native database client.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Datum {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 8-bit signed integer.
    Int8(i8),
    /// 16-bit signed integer.
    Int16(i16),
    /// 32-bit signed integer.
    Int32(i32),
    /// 64-bit signed integer.
    Int64(i64),
    /// 8-bit unsigned integer.
    Uint8(u8),
    /// 16-bit unsigned integer.
    Uint16(u16),
    /// 32-bit unsigned integer.
    Uint32(u32),
    /// 64-bit unsigned integer.
    Uint64(u64),
    /// 32-bit float.
    Float32(f32),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Calendar date.
    Date(NaiveDate),
    /// Date and time without an offset.
    DateTime(NaiveDateTime),
    /// Point-in-time in UTC.
    Timestamp(DateTime<Utc>),
}

impl Datum {
    /// Reports whether this datum is [`Datum::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Returns the kind this datum naturally carries.
    #[must_use]
    pub fn kind(&self) -> Kind {
        match self {
            Datum::Null => Kind::Unknown,
            Datum::Bool(_) => Kind::Bool,
            Datum::Int8(_) => Kind::Int8,
            Datum::Int16(_) => Kind::Int16,
            Datum::Int32(_) => Kind::Int32,
            Datum::Int64(_) => Kind::Int64,
            Datum::Uint8(_) => Kind::Uint8,
            Datum::Uint16(_) => Kind::Uint16,
            Datum::Uint32(_) => Kind::Uint32,
            Datum::Uint64(_) => Kind::Uint64,
            Datum::Float32(_) => Kind::Float32,
            Datum::Float64(_) => Kind::Float64,
            Datum::Text(_) => Kind::String,
            Datum::Bytes(_) => Kind::Bytes,
            Datum::Date(_) => Kind::Time,
            Datum::DateTime(_) => Kind::Timestamp,
            Datum::Timestamp(_) => Kind::Timestamp,
        }
    }

    /// Coerces to a signed 64-bit integer.
    ///
    /// Accepts any integer width (narrowing silently, as representability
    /// loss is not a parse failure) and digit strings in textual or byte
    /// form. Floats are not integers and yield `None`.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Datum::Bool(b) => Some(i64::from(*b)),
            Datum::Int8(v) => Some(i64::from(*v)),
            Datum::Int16(v) => Some(i64::from(*v)),
            Datum::Int32(v) => Some(i64::from(*v)),
            Datum::Int64(v) => Some(*v),
            Datum::Uint8(v) => Some(i64::from(*v)),
            Datum::Uint16(v) => Some(i64::from(*v)),
            Datum::Uint32(v) => Some(i64::from(*v)),
            Datum::Uint64(v) => Some(*v as i64),
            Datum::Text(s) => s.trim().parse().ok(),
            Datum::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces to an unsigned 64-bit integer. Same acceptance rules as
    /// [`Datum::to_i64`].
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn to_u64(&self) -> Option<u64> {
        match self {
            Datum::Bool(b) => Some(u64::from(*b)),
            Datum::Int8(v) => Some(*v as u64),
            Datum::Int16(v) => Some(*v as u64),
            Datum::Int32(v) => Some(*v as u64),
            Datum::Int64(v) => Some(*v as u64),
            Datum::Uint8(v) => Some(u64::from(*v)),
            Datum::Uint16(v) => Some(u64::from(*v)),
            Datum::Uint32(v) => Some(u64::from(*v)),
            Datum::Uint64(v) => Some(*v),
            Datum::Text(s) => s.trim().parse().ok(),
            Datum::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    /// Coerces to a 64-bit float. Accepts floats, any integer width, and
    /// numeric strings in textual or byte form.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Datum::Float32(v) => Some(f64::from(*v)),
            Datum::Float64(v) => Some(*v),
            Datum::Uint64(v) => Some(*v as f64),
            Datum::Text(s) => s.trim().parse().ok(),
            Datum::Bytes(b) => std::str::from_utf8(b).ok()?.trim().parse().ok(),
            other => other.to_i64().map(|v| v as f64),
        }
    }

    /// Coerces to a boolean. Accepts booleans, integers (non-zero is
    /// true), and the usual textual spellings.
    #[must_use]
    pub fn to_bool(&self) -> Option<bool> {
        match self {
            Datum::Bool(b) => Some(*b),
            Datum::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Some(true),
                "false" | "f" | "0" | "no" => Some(false),
                _ => None,
            },
            Datum::Bytes(b) => Datum::Text(String::from_utf8_lossy(b).into_owned()).to_bool(),
            other => other.to_i64().map(|v| v != 0),
        }
    }

    /// Coerces to owned text. Everything except null stringifies.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Datum::Null => None,
            Datum::Text(s) => Some(s.clone()),
            Datum::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            other => Some(other.to_string()),
        }
    }

    /// Coerces to owned bytes. Text converts as UTF-8; other non-null
    /// values convert through their display form.
    #[must_use]
    pub fn to_byte_vec(&self) -> Option<Vec<u8>> {
        match self {
            Datum::Null => None,
            Datum::Bytes(b) => Some(b.clone()),
            Datum::Text(s) => Some(s.clone().into_bytes()),
            other => Some(other.to_string().into_bytes()),
        }
    }

    /// Coerces to a calendar date, parsing `YYYY-MM-DD` from text or
    /// bytes and truncating date-times.
    #[must_use]
    pub fn to_date(&self) -> Option<NaiveDate> {
        match self {
            Datum::Date(d) => Some(*d),
            Datum::DateTime(dt) => Some(dt.date()),
            Datum::Timestamp(ts) => Some(ts.naive_utc().date()),
            Datum::Text(s) => parse_date(s.trim()),
            Datum::Bytes(b) => parse_date(std::str::from_utf8(b).ok()?.trim()),
            _ => None,
        }
    }

    /// Coerces to a naive date-time, accepting temporal variants and the
    /// common textual layouts (space- or `T`-separated, optional
    /// fractional seconds, bare dates).
    #[must_use]
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Datum::DateTime(dt) => Some(*dt),
            Datum::Timestamp(ts) => Some(ts.naive_utc()),
            Datum::Date(d) => d.and_hms_opt(0, 0, 0),
            Datum::Text(s) => parse_datetime(s.trim()),
            Datum::Bytes(b) => parse_datetime(std::str::from_utf8(b).ok()?.trim()),
            _ => None,
        }
    }

    /// Coerces to a UTC timestamp. Naive inputs are taken as UTC.
    #[must_use]
    pub fn to_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Datum::Timestamp(ts) => Some(*ts),
            other => other.to_datetime().map(|dt| dt.and_utc()),
        }
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(dt);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

impl fmt::Display for Datum {
    /// Human-readable form used by diagnostics (CSV dumps, logs). Null
    /// renders as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => Ok(()),
            Datum::Bool(b) => write!(f, "{b}"),
            Datum::Int8(v) => write!(f, "{v}"),
            Datum::Int16(v) => write!(f, "{v}"),
            Datum::Int32(v) => write!(f, "{v}"),
            Datum::Int64(v) => write!(f, "{v}"),
            Datum::Uint8(v) => write!(f, "{v}"),
            Datum::Uint16(v) => write!(f, "{v}"),
            Datum::Uint32(v) => write!(f, "{v}"),
            Datum::Uint64(v) => write!(f, "{v}"),
            Datum::Float32(v) => write!(f, "{v}"),
            Datum::Float64(v) => write!(f, "{v}"),
            Datum::Text(s) => f.write_str(s),
            Datum::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Datum::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Datum::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Datum::Timestamp(ts) => write!(f, "{}", ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}
