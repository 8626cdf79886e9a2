//! Composite (record) binary wire format.
//!
//! Layout: columnCount:i32, then per column attrOid:i32 followed by
//! length:i32 (-1 = null) and the payload. The externally supplied
//! descriptor is authoritative for both the column count and the
//! per-attribute types; the OIDs embedded in the stream are
//! informational and ignored on decode.

use bytes::{BufMut, Bytes, BytesMut};

use crate::cursor::Cursor;
use crate::encoding::ClientEncoding;
use crate::error::{CodecError, Result};
use crate::registry::TypeCodecRegistry;
use crate::value::{CompositeField, CompositeValue, ScalarValue, TypeDescriptor};

/// Decode a binary composite payload against its descriptor.
pub fn decode(
    registry: &TypeCodecRegistry,
    enc: &ClientEncoding,
    raw: &[u8],
    descriptor: &TypeDescriptor,
) -> Result<CompositeValue> {
    let mut cur = Cursor::new(raw);

    let column_count = cur.read_i32()?;
    let expected = descriptor.attribute_count();
    if column_count < 0 || column_count as usize != expected {
        return Err(CodecError::MalformedWireData(format!(
            "composite {:?} declares {expected} attributes but payload has {column_count} columns",
            descriptor.type_name
        )));
    }

    let mut fields = Vec::with_capacity(expected);
    for attr in &descriptor.attributes {
        // informational only; the descriptor's type wins
        let _wire_oid = cur.read_u32()?;
        let value = match cur.read_length()? {
            None => None,
            Some(len) => {
                let codec = registry.resolve(attr.oid)?;
                Some(codec.decode_binary(len, &mut cur, enc)?)
            }
        };
        fields.push(CompositeField {
            name: attr.name.clone(),
            oid: attr.oid,
            value,
        });
    }

    if cur.has_remaining() {
        return Err(CodecError::MalformedWireData(format!(
            "composite {:?}: {} trailing bytes after the last column",
            descriptor.type_name,
            cur.remaining()
        )));
    }

    Ok(CompositeValue {
        type_name: descriptor.type_name.clone(),
        fields,
    })
}

/// Encode a composite value into its binary wire form. The declared
/// attribute OIDs of the descriptor are written into the stream.
pub fn encode(
    registry: &TypeCodecRegistry,
    enc: &ClientEncoding,
    value: &CompositeValue,
    descriptor: &TypeDescriptor,
) -> Result<Bytes> {
    let expected = descriptor.attribute_count();
    if value.fields.len() != expected {
        return Err(CodecError::UnsupportedType(format!(
            "composite {:?} declares {expected} attributes but value has {} fields",
            descriptor.type_name,
            value.fields.len()
        )));
    }

    let mut buf = BytesMut::with_capacity(4 + 12 * expected);
    buf.put_i32(expected as i32);

    let mut scratch = BytesMut::new();
    for (attr, field) in descriptor.attributes.iter().zip(&value.fields) {
        buf.put_u32(attr.oid);
        match &field.value {
            None => buf.put_i32(-1),
            Some(v) => {
                let codec = registry.resolve(attr.oid)?;
                scratch.clear();
                codec.encode_binary(v, enc, &mut scratch)?;
                buf.put_i32(scratch.len() as i32);
                buf.extend_from_slice(&scratch);
            }
        }
    }

    Ok(buf.freeze())
}
