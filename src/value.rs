//! In-memory value model for structured types.
//!
//! Everything here is constructed fresh per decode/encode call. Arrays
//! are stored flat in depth-first row-major order, the same order the
//! wire emits elements; `dims` carries the declared shape.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::{CodecError, Result};

/// PostgreSQL type identifier.
pub type TypeOid = u32;

/// A decoded scalar value of one of the supported base types.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int2(i16),
    Int4(i32),
    /// Also carries `oid` values, which are unsigned 4-byte on the wire.
    Int8(i64),
    Float4(f32),
    Float8(f64),
    Bool(bool),
    Text(String),
    Bytes(Vec<u8>),
    Numeric(Decimal),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<FixedOffset>),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
}

/// A decoded array: declared shape plus a flat element sequence.
///
/// `elements.len()` always equals the product of `dims`. An empty array
/// has `dims == []` (binary) or a single zero-length dimension (text).
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    pub dims: Vec<usize>,
    pub element_oid: TypeOid,
    pub elements: Vec<Option<ScalarValue>>,
}

impl ArrayValue {
    pub fn new(
        dims: Vec<usize>,
        element_oid: TypeOid,
        elements: Vec<Option<ScalarValue>>,
    ) -> Result<Self> {
        let expected: usize = if dims.is_empty() { 0 } else { dims.iter().product() };
        if elements.len() != expected {
            return Err(CodecError::MalformedWireData(format!(
                "array shape {dims:?} implies {expected} elements, got {}",
                elements.len()
            )));
        }
        Ok(ArrayValue { dims, element_oid, elements })
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Number of dimensions in the declared shape.
    pub fn depth(&self) -> usize {
        self.dims.len()
    }
}

/// One attribute of a composite type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    pub oid: TypeOid,
}

/// Ordered attribute list of a composite type, resolved externally
/// through [`crate::registry::TypeInfo`]. The descriptor is
/// authoritative for decoding: wire-embedded attribute OIDs are
/// informational only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_name: String,
    pub attributes: Vec<Attribute>,
}

impl TypeDescriptor {
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}

/// One decoded field of a composite value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeField {
    pub name: String,
    pub oid: TypeOid,
    pub value: Option<ScalarValue>,
}

/// A decoded composite (record) value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeValue {
    pub type_name: String,
    pub fields: Vec<CompositeField>,
}
