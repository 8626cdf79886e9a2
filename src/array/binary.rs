//! Array binary wire format.
//!
//! Layout (big-endian 4-byte integers):
//! - ndims:i32
//! - hasNulls:i32 (advisory only, never trusted on decode)
//! - elementOid:i32
//! - per dimension: length:i32, lowerBound:i32 (ignored; always 1 on encode)
//! - depth-first elements: length:i32 (-1 = null), payload bytes
//!
//! One shared cursor threads through the whole element stream in strict
//! row-major order.

use bytes::{BufMut, Bytes, BytesMut};

use crate::cursor::Cursor;
use crate::encoding::ClientEncoding;
use crate::error::{CodecError, Result};
use crate::registry::{ResolvedCodec, TypeCodecRegistry};
use crate::value::{ArrayValue, ScalarValue, TypeOid};
use crate::walker;

/// Dimension counts beyond this are treated as corrupt wire data.
/// PostgreSQL itself caps MAXDIM at 6.
const MAX_DIMENSIONS: i32 = 6;

// ==================== decode ====================

/// Decode a binary array payload.
///
/// `index` is the 1-based position on the outermost dimension to start
/// from (0 and 1 both mean the beginning); `count` limits how many
/// outermost entries are returned, 0 meaning all. Skipped leading
/// entries are fully decoded and discarded, so a corrupt payload fails
/// the decode no matter which slice is requested.
///
/// The element OID embedded in the wire header is authoritative; the
/// declared array OID of the surrounding column is not consulted here.
pub fn decode(
    registry: &TypeCodecRegistry,
    enc: &ClientEncoding,
    raw: &[u8],
    index: usize,
    count: usize,
) -> Result<ArrayValue> {
    let mut cur = Cursor::new(raw);

    let ndims = cur.read_i32()?;
    let _has_nulls = cur.read_i32()?;
    let element_oid = cur.read_u32()?;

    if !(0..=MAX_DIMENSIONS).contains(&ndims) {
        return Err(CodecError::MalformedWireData(format!(
            "implausible array dimension count {ndims}"
        )));
    }

    let codec = registry.resolve(element_oid)?;

    if ndims == 0 {
        return ArrayValue::new(vec![], element_oid, vec![]);
    }

    let mut dims = Vec::with_capacity(ndims as usize);
    for _ in 0..ndims {
        let len = cur.read_i32()?;
        let _lower_bound = cur.read_i32()?;
        if len < 0 {
            return Err(CodecError::MalformedWireData(format!(
                "negative dimension length {len}"
            )));
        }
        dims.push(len as usize);
    }

    let skip = index.saturating_sub(1).min(dims[0]);
    let available = dims[0] - skip;
    let take = if count > 0 { count.min(available) } else { available };

    if ndims == 1 {
        for _ in 0..skip {
            read_element(&codec, &mut cur, enc)?;
        }
        let mut elements = Vec::with_capacity(take);
        for _ in 0..take {
            elements.push(read_element(&codec, &mut cur, enc)?);
        }
        return ArrayValue::new(vec![take], element_oid, elements);
    }

    // Deeper shapes: fully parse and discard the skipped leading rows so
    // the cursor lands on the first requested element.
    let row = walker::inner_count(&dims);
    for _ in 0..skip * row {
        read_element(&codec, &mut cur, enc)?;
    }

    dims[0] = take;
    let total = walker::element_count(&dims);
    let mut elements = Vec::with_capacity(total);
    for _ in 0..total {
        elements.push(read_element(&codec, &mut cur, enc)?);
    }
    ArrayValue::new(dims, element_oid, elements)
}

fn read_element(
    codec: &ResolvedCodec,
    cur: &mut Cursor<'_>,
    enc: &ClientEncoding,
) -> Result<Option<ScalarValue>> {
    match cur.read_length()? {
        None => Ok(None),
        Some(len) => Ok(Some(codec.decode_binary(len, cur, enc)?)),
    }
}

// ==================== encode ====================

/// Encode an array into its binary wire form.
///
/// The element OID written to the header is resolved from the declared
/// array OID. Output is byte-identical across the 1-D, 2-D and
/// recursive paths for the same logical value.
pub fn encode(
    registry: &TypeCodecRegistry,
    enc: &ClientEncoding,
    array: &ArrayValue,
    array_oid: TypeOid,
) -> Result<Bytes> {
    let element_oid = registry.element_oid(array_oid)?;
    let codec = registry.resolve(element_oid)?;

    // Pass 1: element count, null presence (advisory header flag), and
    // output size for fixed-width element types.
    let nelems = array.elements.len();
    let null_count = array.elements.iter().filter(|e| e.is_none()).count();
    let header = 12 + 8 * array.dims.len();
    let capacity = match codec.binary_width() {
        Some(width) => header + 4 * nelems + width * (nelems - null_count),
        None => header + 8 * nelems,
    };

    let mut buf = BytesMut::with_capacity(capacity);
    buf.put_i32(array.dims.len() as i32);
    buf.put_i32(if null_count > 0 { 1 } else { 0 });
    buf.put_u32(element_oid);
    for dim in &array.dims {
        buf.put_i32(*dim as i32);
        // postgresql uses 1-based lower bounds
        buf.put_i32(1);
    }

    let mut scratch = BytesMut::new();
    match array.dims.len() {
        0 => {}
        1 => write_row(&codec, enc, &array.elements, &mut buf, &mut scratch)?,
        2 => {
            for chunk in walker::rows(&array.dims, &array.elements) {
                write_row(&codec, enc, chunk, &mut buf, &mut scratch)?;
            }
        }
        _ => write_level(&codec, enc, &array.dims, &array.elements, &mut buf, &mut scratch)?,
    }

    Ok(buf.freeze())
}

fn write_level(
    codec: &ResolvedCodec,
    enc: &ClientEncoding,
    dims: &[usize],
    elements: &[Option<ScalarValue>],
    buf: &mut BytesMut,
    scratch: &mut BytesMut,
) -> Result<()> {
    if dims.len() == 1 {
        return write_row(codec, enc, elements, buf, scratch);
    }
    for chunk in walker::rows(dims, elements) {
        write_level(codec, enc, &dims[1..], chunk, buf, scratch)?;
    }
    Ok(())
}

fn write_row(
    codec: &ResolvedCodec,
    enc: &ClientEncoding,
    elements: &[Option<ScalarValue>],
    buf: &mut BytesMut,
    scratch: &mut BytesMut,
) -> Result<()> {
    for element in elements {
        match element {
            None => buf.put_i32(-1),
            Some(value) => {
                scratch.clear();
                codec.encode_binary(value, enc, scratch)?;
                buf.put_i32(scratch.len() as i32);
                buf.extend_from_slice(scratch);
            }
        }
    }
    Ok(())
}
