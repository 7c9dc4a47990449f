//! Typed value containers.
//!
//! Each driver exports a closed set of leaf value types (one per native
//! column type) implementing [`Value`], plus a static [`TypeInfo`]
//! descriptor per type so that schema maps can describe columns and mint
//! fresh values for conversion. Conversion is a two-step dispatch: the
//! kind-compatibility preflight, then `parse` on a fresh instance of the
//! target type fed from the source's [`Value::get`].

use std::any::Any;
use std::fmt;

use crate::datum::Datum;
use crate::error::ValueError;
use crate::kind::Kind;

/// A driver-exported type descriptor: name, kind, size hint, and a
/// factory for fresh (empty) values of the type.
///
/// Descriptors are plain statics; drivers expose one `TypeInfo` constant
/// per native column type.
#[derive(Clone, Copy)]
pub struct TypeInfo {
    name: &'static str,
    kind: Kind,
    size: u64,
    new_value: fn() -> Box<dyn Value>,
}

impl TypeInfo {
    /// Creates a descriptor. `size` is the fixed byte-size hint used by
    /// buffer accounting; variable-length types report their per-unit
    /// size here and their instance size through [`Value::size`].
    #[must_use]
    pub const fn new(
        name: &'static str,
        kind: Kind,
        size: u64,
        new_value: fn() -> Box<dyn Value>,
    ) -> Self {
        Self {
            name,
            kind,
            size,
            new_value,
        }
    }

    /// The native type name, e.g. `"BIGINT"`.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The kind the type maps onto.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The fixed byte-size hint.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Mints a fresh value of this type with no datum stored.
    #[must_use]
    pub fn new_value(&self) -> Box<dyn Value> {
        (self.new_value)()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .finish()
    }
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind && self.size == other.size
    }
}

impl Eq for TypeInfo {}

/// One typed datum in flight through the pipeline.
///
/// A value is created empty by a driver read or a conversion, filled by
/// [`Value::parse`], and owned by the row that contains it. `parse` on
/// [`Datum::Null`] clears the value (`has_value` becomes false); any
/// other accepted datum stores the converted payload. Parse fails only
/// for incompatible shapes, never for representability loss on
/// narrowing.
pub trait Value: Send + Sync {
    /// The native type name this value belongs to.
    fn type_name(&self) -> &'static str;

    /// The kind of the type.
    fn kind(&self) -> Kind;

    /// Parses a raw datum into the value, replacing any stored payload.
    ///
    /// # Errors
    ///
    /// [`ValueError::Invalid`] when the datum's shape is not accepted by
    /// this type.
    fn parse(&mut self, raw: Datum) -> Result<(), ValueError>;

    /// Reports whether a payload is stored.
    fn has_value(&self) -> bool;

    /// Returns the stored payload as a raw datum, or `None` when empty.
    fn get(&self) -> Option<Datum>;

    /// Approximate byte footprint of the current instance.
    fn size(&self) -> u64;

    /// Clones the value behind a fresh box.
    fn clone_value(&self) -> Box<dyn Value>;
}

impl dyn Value + '_ {
    /// Converts this value to `target`'s type.
    ///
    /// The conversion is preflighted by kind compatibility; on success a
    /// fresh value of the target type is returned and `self` is left
    /// untouched.
    ///
    /// # Errors
    ///
    /// [`ValueError::KindNotMatch`] when the kinds are incompatible;
    /// any parse error of the target type otherwise.
    pub fn convert_to(&self, target: TypeInfo) -> Result<Box<dyn Value>, ValueError> {
        if !self.kind().compatible_with(target.kind()) {
            return Err(ValueError::KindNotMatch {
                from: self.kind(),
                to: target.kind(),
            });
        }
        let mut out = target.new_value();
        out.parse(self.get().unwrap_or(Datum::Null))?;
        Ok(out)
    }

    /// Writes the stored payload through into a caller-allocated slot.
    ///
    /// The slot must be a mutable reference to one of the natively
    /// assignable Rust types for this value's kind (the exact-width
    /// native type, any wider integer/float for numerics, `String` for
    /// anything, or `bool` for integers).
    ///
    /// # Errors
    ///
    /// [`ValueError::NotAssignable`] when the slot type cannot hold a
    /// value of this kind, or when the value is empty.
    pub fn assign_to(&self, dest: &mut dyn Any) -> Result<(), ValueError> {
        let not_assignable = || ValueError::NotAssignable { kind: self.kind() };
        let datum = self.get().ok_or_else(not_assignable)?;

        // String slots take anything's display form.
        if let Some(slot) = dest.downcast_mut::<String>() {
            *slot = datum.to_string();
            return Ok(());
        }

        macro_rules! assign_int {
            ($($ty:ty),*) => {
                $(
                    if let Some(slot) = dest.downcast_mut::<$ty>() {
                        #[allow(clippy::cast_possible_truncation)]
                        #[allow(clippy::cast_sign_loss)]
                        #[allow(clippy::cast_possible_wrap)]
                        {
                            *slot = datum.to_i64().ok_or_else(not_assignable)? as $ty;
                        }
                        return Ok(());
                    }
                )*
            };
        }

        match datum.kind() {
            Kind::Bool => {
                if let Some(slot) = dest.downcast_mut::<bool>() {
                    *slot = datum.to_bool().ok_or_else(not_assignable)?;
                    return Ok(());
                }
                assign_int!(i8, i16, i32, i64, u8, u16, u32, u64);
            }
            k if k.compatible_with(Kind::Int64) => {
                if let Some(slot) = dest.downcast_mut::<bool>() {
                    *slot = datum.to_bool().ok_or_else(not_assignable)?;
                    return Ok(());
                }
                if let Some(slot) = dest.downcast_mut::<f64>() {
                    *slot = datum.to_f64().ok_or_else(not_assignable)?;
                    return Ok(());
                }
                if let Some(slot) = dest.downcast_mut::<f32>() {
                    #[allow(clippy::cast_possible_truncation)]
                    {
                        *slot = datum.to_f64().ok_or_else(not_assignable)? as f32;
                    }
                    return Ok(());
                }
                assign_int!(i8, i16, i32, i64, u8, u16, u32, u64);
            }
            Kind::String | Kind::Bytes => {
                if let Some(slot) = dest.downcast_mut::<Vec<u8>>() {
                    *slot = datum.to_byte_vec().ok_or_else(not_assignable)?;
                    return Ok(());
                }
            }
            Kind::Time | Kind::Timestamp => {
                if let Some(slot) = dest.downcast_mut::<chrono::NaiveDateTime>() {
                    *slot = datum.to_datetime().ok_or_else(not_assignable)?;
                    return Ok(());
                }
                if let Some(slot) = dest.downcast_mut::<chrono::NaiveDate>() {
                    *slot = datum.to_date().ok_or_else(not_assignable)?;
                    return Ok(());
                }
                if let Some(slot) = dest.downcast_mut::<chrono::DateTime<chrono::Utc>>() {
                    *slot = datum.to_timestamp().ok_or_else(not_assignable)?;
                    return Ok(());
                }
            }
            _ => {}
        }
        Err(not_assignable())
    }
}

impl fmt::Debug for dyn Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.type_name())?;
        match self.get() {
            Some(d) => write!(f, "{d}")?,
            None => f.write_str("null")?,
        }
        f.write_str(")")
    }
}
