//! Generic, engine-neutral value types.
//!
//! Drivers normally export their own leaf types named after native
//! column types; these generic implementations cover the common shapes
//! for tests, tooling, and drivers whose engines have no richer naming.

use chrono::{DateTime, Utc};

use crate::datum::Datum;
use crate::error::ValueError;
use crate::kind::Kind;
use crate::value::{TypeInfo, Value};

/// Descriptor for [`BoolValue`].
pub const BOOL: TypeInfo = TypeInfo::new("bool", Kind::Bool, 1, || Box::<BoolValue>::default());

/// Descriptor for [`Int64Value`].
pub const INT64: TypeInfo = TypeInfo::new("int64", Kind::Int64, 8, || {
    Box::<Int64Value>::default()
});

/// Descriptor for [`Uint64Value`].
pub const UINT64: TypeInfo = TypeInfo::new("uint64", Kind::Uint64, 8, || {
    Box::<Uint64Value>::default()
});

/// Descriptor for [`Float64Value`].
pub const FLOAT64: TypeInfo = TypeInfo::new("float64", Kind::Float64, 8, || {
    Box::<Float64Value>::default()
});

/// Descriptor for [`StringValue`].
pub const STRING: TypeInfo = TypeInfo::new("string", Kind::String, 1, || {
    Box::<StringValue>::default()
});

/// Descriptor for [`BytesValue`].
pub const BYTES: TypeInfo = TypeInfo::new("bytes", Kind::Bytes, 1, || {
    Box::<BytesValue>::default()
});

/// Descriptor for [`TimestampValue`].
pub const TIMESTAMP: TypeInfo = TypeInfo::new("timestamp", Kind::Timestamp, 8, || {
    Box::<TimestampValue>::default()
});

/// Boolean value.
#[derive(Debug, Default, Clone)]
pub struct BoolValue {
    value: Option<bool>,
}

impl Value for BoolValue {
    fn type_name(&self) -> &'static str {
        "bool"
    }

    fn kind(&self) -> Kind {
        Kind::Bool
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(raw.to_bool().ok_or_else(|| ValueError::invalid("bool", &raw))?);
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.map(Datum::Bool)
    }

    fn size(&self) -> u64 {
        1
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// 64-bit signed integer value.
#[derive(Debug, Default, Clone)]
pub struct Int64Value {
    value: Option<i64>,
}

impl Value for Int64Value {
    fn type_name(&self) -> &'static str {
        "int64"
    }

    fn kind(&self) -> Kind {
        Kind::Int64
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(raw.to_i64().ok_or_else(|| ValueError::invalid("int64", &raw))?);
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.map(Datum::Int64)
    }

    fn size(&self) -> u64 {
        8
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// 64-bit unsigned integer value.
#[derive(Debug, Default, Clone)]
pub struct Uint64Value {
    value: Option<u64>,
}

impl Value for Uint64Value {
    fn type_name(&self) -> &'static str {
        "uint64"
    }

    fn kind(&self) -> Kind {
        Kind::Uint64
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(raw.to_u64().ok_or_else(|| ValueError::invalid("uint64", &raw))?);
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.map(Datum::Uint64)
    }

    fn size(&self) -> u64 {
        8
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// 64-bit float value.
#[derive(Debug, Default, Clone)]
pub struct Float64Value {
    value: Option<f64>,
}

impl Value for Float64Value {
    fn type_name(&self) -> &'static str {
        "float64"
    }

    fn kind(&self) -> Kind {
        Kind::Float64
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(raw.to_f64().ok_or_else(|| ValueError::invalid("float64", &raw))?);
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.map(Datum::Float64)
    }

    fn size(&self) -> u64 {
        8
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// UTF-8 text value.
#[derive(Debug, Default, Clone)]
pub struct StringValue {
    value: Option<String>,
}

impl Value for StringValue {
    fn type_name(&self) -> &'static str {
        "string"
    }

    fn kind(&self) -> Kind {
        Kind::String
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(raw.to_text().ok_or_else(|| ValueError::invalid("string", &raw))?);
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.clone().map(Datum::Text)
    }

    fn size(&self) -> u64 {
        self.value.as_ref().map_or(0, |s| s.len() as u64)
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// Raw byte-string value.
#[derive(Debug, Default, Clone)]
pub struct BytesValue {
    value: Option<Vec<u8>>,
}

impl Value for BytesValue {
    fn type_name(&self) -> &'static str {
        "bytes"
    }

    fn kind(&self) -> Kind {
        Kind::Bytes
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(
            raw.to_byte_vec()
                .ok_or_else(|| ValueError::invalid("bytes", &raw))?,
        );
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.clone().map(Datum::Bytes)
    }

    fn size(&self) -> u64 {
        self.value.as_ref().map_or(0, |b| b.len() as u64)
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

/// UTC timestamp value.
#[derive(Debug, Default, Clone)]
pub struct TimestampValue {
    value: Option<DateTime<Utc>>,
}

impl Value for TimestampValue {
    fn type_name(&self) -> &'static str {
        "timestamp"
    }

    fn kind(&self) -> Kind {
        Kind::Timestamp
    }

    fn parse(&mut self, raw: Datum) -> Result<(), ValueError> {
        if raw.is_null() {
            self.value = None;
            return Ok(());
        }
        self.value = Some(
            raw.to_timestamp()
                .ok_or_else(|| ValueError::invalid("timestamp", &raw))?,
        );
        Ok(())
    }

    fn has_value(&self) -> bool {
        self.value.is_some()
    }

    fn get(&self) -> Option<Datum> {
        self.value.map(Datum::Timestamp)
    }

    fn size(&self) -> u64 {
        8
    }

    fn clone_value(&self) -> Box<dyn Value> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_null_clears() {
        let mut v = Int64Value::default();
        v.parse(Datum::Int64(1)).unwrap();
        assert!(v.has_value());
        v.parse(Datum::Null).unwrap();
        assert!(!v.has_value());
        assert_eq!(v.get(), None);
    }

    #[test]
    fn test_parse_accepts_smaller_widths_and_text() {
        let mut v = Int64Value::default();
        v.parse(Datum::Int8(5)).unwrap();
        assert_eq!(v.get(), Some(Datum::Int64(5)));
        v.parse(Datum::Bytes(b"77".to_vec())).unwrap();
        assert_eq!(v.get(), Some(Datum::Int64(77)));
    }

    #[test]
    fn test_parse_rejects_incompatible_shape() {
        let mut v = Float64Value::default();
        let err = v.parse(Datum::Text("not a number".into())).unwrap_err();
        assert!(matches!(err, ValueError::Invalid { .. }));
    }

    #[test]
    fn test_string_size_tracks_payload() {
        let mut v = StringValue::default();
        assert_eq!(v.size(), 0);
        v.parse(Datum::Text("hello".into())).unwrap();
        assert_eq!(v.size(), 5);
    }

    #[test]
    fn test_descriptors_mint_matching_values() {
        for info in [BOOL, INT64, UINT64, FLOAT64, STRING, BYTES, TIMESTAMP] {
            let v = info.new_value();
            assert_eq!(v.kind(), info.kind());
            assert_eq!(v.type_name(), info.name());
            assert!(!v.has_value());
        }
    }
}
