//! CockroachDB value types.
//!
//! One leaf type per native column type the driver writes. Names follow
//! <https://www.cockroachlabs.com/docs/stable/data-types.html>.

use chrono::{DateTime, NaiveDate, Utc};

use rowferry_core::{Datum, Kind, TypeInfo, Value, ValueError};

use crate::error::ConnectorError;

macro_rules! cockroach_value_type {
    (
        $(#[$meta:meta])*
        $name:ident, $info:ident, $type_name:literal, $kind:expr, $hint:expr,
        native: $native:ty,
        coerce: $coerce:ident => $conv:expr,
        datum: $wrap:expr,
        size: $size:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone)]
        pub struct $name {
            value: Option<$native>,
        }

        impl Value for $name {
            fn type_name(&self) -> &'static str {
                $type_name
            }

            fn kind(&self) -> Kind {
                $kind
            }

            fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
                if raw.is_null() {
                    self.value = None;
                    return Ok(());
                }
                let coerced = raw
                    .$coerce()
                    .ok_or_else(|| ValueError::invalid($type_name, &raw))?;
                #[allow(clippy::redundant_closure_call)]
                {
                    self.value = Some(($conv)(coerced));
                }
                Ok(())
            }

            fn has_value(&self) -> bool {
                self.value.is_some()
            }

            fn get(&self) -> Option<Datum> {
                #[allow(clippy::redundant_closure_call)]
                self.value.clone().map($wrap)
            }

            fn size(&self) -> u64 {
                #[allow(clippy::redundant_closure_call)]
                (($size)(&self.value))
            }

            fn clone_value(&self) -> Box<dyn Value> {
                Box::new(self.clone())
            }
        }

        /// Type descriptor.
        pub const $info: TypeInfo = TypeInfo::new($type_name, $kind, $hint, || {
            Box::<$name>::default()
        });
    };
}

fn text_len(value: &Option<String>) -> u64 {
    value.as_ref().map_or(0, |s| s.len() as u64)
}

fn byte_len(value: &Option<Vec<u8>>) -> u64 {
    value.as_ref().map_or(0, |b| b.len() as u64)
}

cockroach_value_type!(
    /// `BOOL` value.
    BoolValue, BOOL, "BOOL", Kind::Bool, 1,
    native: bool,
    coerce: to_bool => |v| v,
    datum: Datum::Bool,
    size: |_: &Option<bool>| 1
);

cockroach_value_type!(
    /// `INT` value (8 bytes, covers `INT2`/`INT4`/`INT8`).
    IntValue, INT, "INT", Kind::Int64, 8,
    native: i64,
    coerce: to_i64 => |v| v,
    datum: Datum::Int64,
    size: |_: &Option<i64>| 8
);

cockroach_value_type!(
    /// `FLOAT` value.
    FloatValue, FLOAT, "FLOAT", Kind::Float64, 8,
    native: f64,
    coerce: to_f64 => |v| v,
    datum: Datum::Float64,
    size: |_: &Option<f64>| 8
);

cockroach_value_type!(
    /// `DECIMAL` value, carried in its exact textual form.
    DecimalValue, DECIMAL, "DECIMAL", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

cockroach_value_type!(
    /// `STRING` value (covers `VARCHAR`/`TEXT`/`CHAR`).
    StringValue, STRING, "STRING", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

cockroach_value_type!(
    /// `BYTES` value (covers `BYTEA`/`BLOB`).
    BytesValue, BYTES, "BYTES", Kind::Bytes, 1,
    native: Vec<u8>,
    coerce: to_byte_vec => |v| v,
    datum: Datum::Bytes,
    size: byte_len
);

cockroach_value_type!(
    /// `UUID` value, carried textually.
    UuidValue, UUID, "UUID", Kind::String, 16,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: |_: &Option<String>| 16
);

cockroach_value_type!(
    /// `DATE` value.
    DateValue, DATE, "DATE", Kind::Time, 8,
    native: NaiveDate,
    coerce: to_date => |v| v,
    datum: Datum::Date,
    size: |_: &Option<NaiveDate>| 8
);

cockroach_value_type!(
    /// `TIMESTAMP` value (covers `TIMESTAMPTZ`, stored in UTC).
    TimestampValue, TIMESTAMP, "TIMESTAMP", Kind::Timestamp, 12,
    native: DateTime<Utc>,
    coerce: to_timestamp => |v| v,
    datum: Datum::Timestamp,
    size: |_: &Option<DateTime<Utc>>| 12
);

cockroach_value_type!(
    /// `JSONB` value, carried as its serialised bytes.
    JsonbValue, JSONB, "JSONB", Kind::Bytes, 1,
    native: Vec<u8>,
    coerce: to_byte_vec => |v| v,
    datum: Datum::Bytes,
    size: byte_len
);

/// Resolves a type descriptor from an `information_schema` type name,
/// e.g. `bigint`, `character varying`, or `timestamp with time zone`.
///
/// # Errors
///
/// [`ConnectorError::TypeNotFound`] for names the driver does not know.
pub fn type_from_name(name: &str) -> Result<TypeInfo, ConnectorError> {
    let lower = name.to_ascii_lowercase();
    let matches_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    // Checked most-specific first: several names embed another type's
    // name as a substring (e.g. "timestamptz" contains "timestamp",
    // "uuid" must win over generic string names).
    if matches_any(&["bool"]) {
        Ok(BOOL)
    } else if matches_any(&["uuid"]) {
        Ok(UUID)
    } else if matches_any(&["jsonb", "json"]) {
        Ok(JSONB)
    } else if matches_any(&["bytes", "bytea", "blob"]) {
        Ok(BYTES)
    } else if matches_any(&["timestamp"]) {
        Ok(TIMESTAMP)
    } else if matches_any(&["date"]) {
        Ok(DATE)
    } else if matches_any(&["decimal", "numeric"]) {
        Ok(DECIMAL)
    } else if matches_any(&["int", "serial"]) {
        Ok(INT)
    } else if matches_any(&["float", "real", "double"]) {
        Ok(FLOAT)
    } else if matches_any(&["string", "varchar", "character", "char", "text"]) {
        Ok(STRING)
    } else {
        Err(ConnectorError::TypeNotFound(name.to_owned()))
    }
}
