//! MySQL value types.
//!
//! One leaf type per native column type the driver reads. Each accepts
//! the client's native representation, null, the textual/byte form, and
//! (for numerics) any smaller integer width.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mysql_async::consts::{ColumnFlags, ColumnType};

use rowferry_core::{Datum, Kind, TypeInfo, Value, ValueError};

use crate::error::ConnectorError;

macro_rules! mysql_value_type {
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
                #[allow(clippy::cast_possible_truncation)]
                #[allow(clippy::cast_sign_loss)]
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

mysql_value_type!(
    /// `CHAR` value.
    CharValue, CHAR, "CHAR", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

mysql_value_type!(
    /// `VARCHAR` value.
    VarcharValue, VARCHAR, "VARCHAR", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

mysql_value_type!(
    /// `TEXT` value (also covers `TINYTEXT`/`MEDIUMTEXT`/`LONGTEXT`).
    TextValue, TEXT, "TEXT", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

mysql_value_type!(
    /// `DECIMAL` value, carried in its exact textual form.
    DecimalValue, DECIMAL, "DECIMAL", Kind::String, 4,
    native: String,
    coerce: to_text => |v| v,
    datum: Datum::Text,
    size: text_len
);

mysql_value_type!(
    /// `TINYINT` value.
    TinyIntValue, TINYINT, "TINYINT", Kind::Int8, 1,
    native: i8,
    coerce: to_i64 => |v| v as i8,
    datum: Datum::Int8,
    size: |_: &Option<i8>| 1
);

mysql_value_type!(
    /// `SMALLINT` value.
    SmallIntValue, SMALLINT, "SMALLINT", Kind::Int16, 2,
    native: i16,
    coerce: to_i64 => |v| v as i16,
    datum: Datum::Int16,
    size: |_: &Option<i16>| 2
);

mysql_value_type!(
    /// `INT` value (also covers `MEDIUMINT`).
    IntValue, INT, "INT", Kind::Int32, 4,
    native: i32,
    coerce: to_i64 => |v| v as i32,
    datum: Datum::Int32,
    size: |_: &Option<i32>| 4
);

mysql_value_type!(
    /// `BIGINT` value.
    BigIntValue, BIGINT, "BIGINT", Kind::Int64, 8,
    native: i64,
    coerce: to_i64 => |v| v,
    datum: Datum::Int64,
    size: |_: &Option<i64>| 8
);

mysql_value_type!(
    /// `FLOAT` value.
    FloatValue, FLOAT, "FLOAT", Kind::Float32, 4,
    native: f32,
    coerce: to_f64 => |v| v as f32,
    datum: Datum::Float32,
    size: |_: &Option<f32>| 4
);

mysql_value_type!(
    /// `DOUBLE` value.
    DoubleValue, DOUBLE, "DOUBLE", Kind::Float64, 8,
    native: f64,
    coerce: to_f64 => |v| v,
    datum: Datum::Float64,
    size: |_: &Option<f64>| 8
);

mysql_value_type!(
    /// `DATE` value.
    DateValue, DATE, "DATE", Kind::Time, 8,
    native: NaiveDate,
    coerce: to_date => |v| v,
    datum: Datum::Date,
    size: |_: &Option<NaiveDate>| 8
);

mysql_value_type!(
    /// `DATETIME` value.
    DateTimeValue, DATETIME, "DATETIME", Kind::Timestamp, 8,
    native: NaiveDateTime,
    coerce: to_datetime => |v| v,
    datum: Datum::DateTime,
    size: |_: &Option<NaiveDateTime>| 8
);

mysql_value_type!(
    /// `TIMESTAMP` value.
    TimestampValue, TIMESTAMP, "TIMESTAMP", Kind::Timestamp, 8,
    native: DateTime<Utc>,
    coerce: to_timestamp => |v| v,
    datum: Datum::Timestamp,
    size: |_: &Option<DateTime<Utc>>| 8
);

mysql_value_type!(
    /// `BLOB` value (also covers `TINYBLOB`/`MEDIUMBLOB`).
    BlobValue, BLOB, "BLOB", Kind::Bytes, 1,
    native: Vec<u8>,
    coerce: to_byte_vec => |v| v,
    datum: Datum::Bytes,
    size: byte_len
);

mysql_value_type!(
    /// `LONGBLOB` value.
    LongBlobValue, LONGBLOB, "LONGBLOB", Kind::Bytes, 1,
    native: Vec<u8>,
    coerce: to_byte_vec => |v| v,
    datum: Datum::Bytes,
    size: byte_len
);

/// Resolves a type descriptor from the textual name `SHOW COLUMNS`
/// reports, e.g. `varchar(255)` or `bigint unsigned`.
///
/// # Errors
///
/// [`ConnectorError::TypeNotFound`] for names the driver does not know.
pub fn type_from_name(name: &str) -> Result<TypeInfo, ConnectorError> {
    let bare = name.split(['(', ' ']).next().unwrap_or_default();
    match bare.to_ascii_uppercase().as_str() {
        "CHAR" => Ok(CHAR),
        "VARCHAR" => Ok(VARCHAR),
        "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" => Ok(TEXT),
        "DECIMAL" | "NUMERIC" => Ok(DECIMAL),
        "TINYINT" | "BOOL" | "BOOLEAN" => Ok(TINYINT),
        "SMALLINT" => Ok(SMALLINT),
        "INT" | "INTEGER" | "MEDIUMINT" => Ok(INT),
        "BIGINT" => Ok(BIGINT),
        "FLOAT" => Ok(FLOAT),
        "DOUBLE" | "REAL" => Ok(DOUBLE),
        "DATE" => Ok(DATE),
        "DATETIME" => Ok(DATETIME),
        "TIMESTAMP" => Ok(TIMESTAMP),
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" => Ok(BLOB),
        "LONGBLOB" => Ok(LONGBLOB),
        _ => Err(ConnectorError::TypeNotFound(name.to_owned())),
    }
}

/// Resolves a type descriptor from the wire column metadata of a result
/// set.
///
/// # Errors
///
/// [`ConnectorError::TypeNotFound`] for column types the driver does not
/// know.
pub fn type_from_column(
    column_type: ColumnType,
    flags: ColumnFlags,
) -> Result<TypeInfo, ConnectorError> {
    let binary = flags.contains(ColumnFlags::BINARY_FLAG);
    match column_type {
        ColumnType::MYSQL_TYPE_STRING => Ok(CHAR),
        ColumnType::MYSQL_TYPE_VAR_STRING | ColumnType::MYSQL_TYPE_VARCHAR => Ok(VARCHAR),
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => Ok(DECIMAL),
        ColumnType::MYSQL_TYPE_TINY => Ok(TINYINT),
        ColumnType::MYSQL_TYPE_SHORT => Ok(SMALLINT),
        ColumnType::MYSQL_TYPE_LONG | ColumnType::MYSQL_TYPE_INT24 => Ok(INT),
        ColumnType::MYSQL_TYPE_LONGLONG => Ok(BIGINT),
        ColumnType::MYSQL_TYPE_FLOAT => Ok(FLOAT),
        ColumnType::MYSQL_TYPE_DOUBLE => Ok(DOUBLE),
        ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => Ok(DATE),
        ColumnType::MYSQL_TYPE_DATETIME => Ok(DATETIME),
        ColumnType::MYSQL_TYPE_TIMESTAMP => Ok(TIMESTAMP),
        ColumnType::MYSQL_TYPE_LONG_BLOB => Ok(LONGBLOB),
        ColumnType::MYSQL_TYPE_TINY_BLOB
        | ColumnType::MYSQL_TYPE_MEDIUM_BLOB
        | ColumnType::MYSQL_TYPE_BLOB => {
            if binary {
                Ok(BLOB)
            } else {
                Ok(TEXT)
            }
        }
        other => Err(ConnectorError::TypeNotFound(format!("{other:?}"))),
    }
}
