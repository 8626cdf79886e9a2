//! Per-base-type scalar codec.
//!
//! Binary layout notes (all integers big-endian):
//! - int2/int4/int8: 2/4/8 bytes two's complement
//! - float4/float8: IEEE754 bit patterns
//! - bool: single byte, 1 = true
//! - oid: unsigned 4 bytes, widened to i64 in memory
//! - text family: exactly `len` bytes in the connection encoding
//! - jsonb: one version byte (currently 1), then text
//! - numeric: ndigits:i16, weight:i16, sign:u16, dscale:u16,
//!   then ndigits base-10000 digit groups of 2 bytes each
//! - date: i32 days since 2000-01-01
//! - time: i64 microseconds since midnight
//! - timestamp/timestamptz: i64 microseconds since 2000-01-01T00:00:00

use std::str::FromStr;

use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;

use crate::cursor::Cursor;
use crate::encoding::ClientEncoding;
use crate::error::{CodecError, Result};
use crate::oid::oid;
use crate::value::ScalarValue;

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;

const JSONB_VERSION: u8 = 1;

/// Closed set of base types with built-in codecs.
///
/// Extension types never appear here; they dispatch through
/// [`crate::registry::ExtensionCodec`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Int2,
    Int4,
    Int8,
    Oid,
    Float4,
    Float8,
    Bool,
    Text,
    Bytea,
    Json,
    Jsonb,
    Numeric,
    Date,
    Time,
    Timestamp,
    TimestampTz,
}

impl ScalarKind {
    /// Fixed base-type table keyed by OID; first step of registry dispatch.
    pub fn for_oid(type_oid: u32) -> Option<ScalarKind> {
        let kind = match type_oid {
            oid::INT2 => ScalarKind::Int2,
            oid::INT4 => ScalarKind::Int4,
            oid::INT8 => ScalarKind::Int8,
            oid::OID => ScalarKind::Oid,
            oid::FLOAT4 => ScalarKind::Float4,
            oid::FLOAT8 => ScalarKind::Float8,
            oid::BOOL => ScalarKind::Bool,
            oid::TEXT | oid::VARCHAR | oid::BPCHAR | oid::CHAR | oid::NAME => ScalarKind::Text,
            oid::BYTEA => ScalarKind::Bytea,
            oid::JSON => ScalarKind::Json,
            oid::JSONB => ScalarKind::Jsonb,
            oid::NUMERIC => ScalarKind::Numeric,
            oid::DATE => ScalarKind::Date,
            oid::TIME => ScalarKind::Time,
            oid::TIMESTAMP => ScalarKind::Timestamp,
            oid::TIMESTAMPTZ => ScalarKind::TimestampTz,
            _ => return None,
        };
        Some(kind)
    }

    /// Wire width for fixed-width kinds, `None` for variable-width ones.
    pub fn fixed_width(self) -> Option<usize> {
        match self {
            ScalarKind::Int2 => Some(2),
            ScalarKind::Int4 | ScalarKind::Oid | ScalarKind::Float4 | ScalarKind::Date => Some(4),
            ScalarKind::Int8
            | ScalarKind::Float8
            | ScalarKind::Time
            | ScalarKind::Timestamp
            | ScalarKind::TimestampTz => Some(8),
            ScalarKind::Bool => Some(1),
            _ => None,
        }
    }
}

fn pg_epoch_date() -> NaiveDate {
    // 2000-01-01 is always a valid date
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

fn pg_epoch_datetime() -> NaiveDateTime {
    pg_epoch_date().and_hms_opt(0, 0, 0).unwrap_or_default()
}

// ==================== binary decode ====================

/// Decode one scalar of the given kind, consuming exactly `len` bytes.
pub fn decode_binary(
    kind: ScalarKind,
    len: usize,
    cur: &mut Cursor<'_>,
    enc: &ClientEncoding,
) -> Result<ScalarValue> {
    if let Some(width) = kind.fixed_width() {
        if len != width {
            return Err(CodecError::MalformedWireData(format!(
                "{kind:?} expects {width} bytes, wire declares {len}"
            )));
        }
    }
    match kind {
        ScalarKind::Int2 => Ok(ScalarValue::Int2(cur.read_i16()?)),
        ScalarKind::Int4 => Ok(ScalarValue::Int4(cur.read_i32()?)),
        ScalarKind::Int8 => Ok(ScalarValue::Int8(cur.read_i64()?)),
        ScalarKind::Oid => Ok(ScalarValue::Int8(cur.read_u32()? as i64)),
        ScalarKind::Float4 => Ok(ScalarValue::Float4(cur.read_f32()?)),
        ScalarKind::Float8 => Ok(ScalarValue::Float8(cur.read_f64()?)),
        ScalarKind::Bool => Ok(ScalarValue::Bool(cur.read_u8()? == 1)),
        ScalarKind::Text | ScalarKind::Json => {
            let raw = cur.take(len)?;
            Ok(ScalarValue::Text(enc.decode(raw)?.to_owned()))
        }
        ScalarKind::Jsonb => {
            if len == 0 {
                return Err(CodecError::MalformedWireData("empty jsonb payload".into()));
            }
            let version = cur.read_u8()?;
            if version != JSONB_VERSION {
                return Err(CodecError::MalformedWireData(format!(
                    "unknown jsonb wire version {version}"
                )));
            }
            let raw = cur.take(len - 1)?;
            Ok(ScalarValue::Text(enc.decode(raw)?.to_owned()))
        }
        ScalarKind::Bytea => Ok(ScalarValue::Bytes(cur.take(len)?.to_vec())),
        ScalarKind::Numeric => {
            let raw = cur.take(len)?;
            decode_numeric(raw)
        }
        ScalarKind::Date => {
            let days = cur.read_i32()?;
            pg_epoch_date()
                .checked_add_signed(Duration::days(days as i64))
                .map(ScalarValue::Date)
                .ok_or_else(|| CodecError::MalformedWireData(format!("date out of range: {days}")))
        }
        ScalarKind::Time => {
            let micros = cur.read_i64()?;
            if !(0..86_400_000_000).contains(&micros) {
                return Err(CodecError::MalformedWireData(format!(
                    "time out of range: {micros}"
                )));
            }
            let secs = (micros / 1_000_000) as u32;
            let nanos = ((micros % 1_000_000) * 1000) as u32;
            NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
                .map(ScalarValue::Time)
                .ok_or_else(|| CodecError::MalformedWireData(format!("time out of range: {micros}")))
        }
        ScalarKind::Timestamp => {
            let micros = cur.read_i64()?;
            timestamp_from_micros(micros).map(ScalarValue::Timestamp)
        }
        ScalarKind::TimestampTz => {
            let micros = cur.read_i64()?;
            let naive = timestamp_from_micros(micros)?;
            Ok(ScalarValue::TimestampTz(
                DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).fixed_offset(),
            ))
        }
    }
}

fn timestamp_from_micros(micros: i64) -> Result<NaiveDateTime> {
    // i64::MAX/MIN are the infinity sentinels, which the value model
    // cannot represent.
    pg_epoch_datetime()
        .checked_add_signed(Duration::microseconds(micros))
        .ok_or_else(|| CodecError::MalformedWireData(format!("timestamp out of range: {micros}")))
}

// ==================== binary encode ====================

/// Append the binary payload of `value` interpreted as `kind`.
///
/// The caller writes the 4-byte length prefix; this emits the payload
/// only. Kind and value must agree, value/kind drift is a caller bug
/// surfaced as `UnsupportedType`.
pub fn encode_binary(
    kind: ScalarKind,
    value: &ScalarValue,
    enc: &ClientEncoding,
    out: &mut BytesMut,
) -> Result<()> {
    match (kind, value) {
        (ScalarKind::Int2, ScalarValue::Int2(v)) => out.put_i16(*v),
        (ScalarKind::Int4, ScalarValue::Int4(v)) => out.put_i32(*v),
        (ScalarKind::Int8, ScalarValue::Int8(v)) => out.put_i64(*v),
        (ScalarKind::Oid, ScalarValue::Int8(v)) => {
            let unsigned = u32::try_from(*v).map_err(|_| {
                CodecError::MalformedWireData(format!("oid value out of range: {v}"))
            })?;
            out.put_u32(unsigned);
        }
        (ScalarKind::Float4, ScalarValue::Float4(v)) => out.put_u32(v.to_bits()),
        (ScalarKind::Float8, ScalarValue::Float8(v)) => out.put_u64(v.to_bits()),
        (ScalarKind::Bool, ScalarValue::Bool(v)) => out.put_u8(if *v { 1 } else { 0 }),
        (ScalarKind::Text | ScalarKind::Json, ScalarValue::Text(s)) => {
            out.put_slice(&enc.encode(s)?);
        }
        (ScalarKind::Jsonb, ScalarValue::Text(s)) => {
            out.put_u8(JSONB_VERSION);
            out.put_slice(&enc.encode(s)?);
        }
        (ScalarKind::Bytea, ScalarValue::Bytes(b)) => out.put_slice(b),
        (ScalarKind::Numeric, ScalarValue::Numeric(d)) => encode_numeric(d, out),
        (ScalarKind::Date, ScalarValue::Date(d)) => {
            let days = (*d - pg_epoch_date()).num_days();
            let days = i32::try_from(days).map_err(|_| {
                CodecError::MalformedWireData(format!("date out of range: {d}"))
            })?;
            out.put_i32(days);
        }
        (ScalarKind::Time, ScalarValue::Time(t)) => {
            let micros =
                t.num_seconds_from_midnight() as i64 * 1_000_000 + (t.nanosecond() / 1000) as i64;
            out.put_i64(micros);
        }
        (ScalarKind::Timestamp, ScalarValue::Timestamp(ts)) => {
            out.put_i64(micros_since_epoch(*ts)?);
        }
        (ScalarKind::TimestampTz, ScalarValue::TimestampTz(ts)) => {
            out.put_i64(micros_since_epoch(ts.naive_utc())?);
        }
        (kind, value) => {
            return Err(CodecError::UnsupportedType(format!(
                "cannot encode {value:?} as {kind:?}"
            )));
        }
    }
    Ok(())
}

fn micros_since_epoch(ts: NaiveDateTime) -> Result<i64> {
    (ts - pg_epoch_datetime())
        .num_microseconds()
        .ok_or_else(|| CodecError::MalformedWireData(format!("timestamp out of range: {ts}")))
}

// ==================== text decode ====================

/// Decode the text representation of one scalar of the given kind.
pub fn decode_text(kind: ScalarKind, s: &str) -> Result<ScalarValue> {
    match kind {
        ScalarKind::Int2 => parse_num(s).map(ScalarValue::Int2),
        ScalarKind::Int4 => parse_num(s).map(ScalarValue::Int4),
        ScalarKind::Int8 | ScalarKind::Oid => parse_num(s).map(ScalarValue::Int8),
        ScalarKind::Float4 => parse_float4(s).map(ScalarValue::Float4),
        ScalarKind::Float8 => parse_float8(s).map(ScalarValue::Float8),
        ScalarKind::Bool => parse_bool(s).map(ScalarValue::Bool),
        ScalarKind::Text | ScalarKind::Json | ScalarKind::Jsonb => {
            Ok(ScalarValue::Text(s.to_owned()))
        }
        ScalarKind::Bytea => parse_bytea(s).map(ScalarValue::Bytes),
        ScalarKind::Numeric => Decimal::from_str(s)
            .map(ScalarValue::Numeric)
            .map_err(|e| bad_literal("numeric", s, &e.to_string())),
        ScalarKind::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(ScalarValue::Date)
            .map_err(|e| bad_literal("date", s, &e.to_string())),
        ScalarKind::Time => NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
            .map(ScalarValue::Time)
            .map_err(|e| bad_literal("time", s, &e.to_string())),
        ScalarKind::Timestamp => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
            .map(ScalarValue::Timestamp)
            .map_err(|e| bad_literal("timestamp", s, &e.to_string())),
        ScalarKind::TimestampTz => DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z")
            .map(ScalarValue::TimestampTz)
            .map_err(|e| bad_literal("timestamptz", s, &e.to_string())),
    }
}

fn bad_literal(type_name: &str, s: &str, detail: &str) -> CodecError {
    CodecError::InvalidSyntax(format!("invalid {type_name} literal {s:?}: {detail}"))
}

fn parse_num<T: FromStr>(s: &str) -> Result<T> {
    s.trim()
        .parse()
        .map_err(|_| CodecError::InvalidSyntax(format!("invalid numeric literal {s:?}")))
}

fn parse_float4(s: &str) -> Result<f32> {
    match s {
        "NaN" => Ok(f32::NAN),
        "Infinity" => Ok(f32::INFINITY),
        "-Infinity" => Ok(f32::NEG_INFINITY),
        _ => parse_num(s),
    }
}

fn parse_float8(s: &str) -> Result<f64> {
    match s {
        "NaN" => Ok(f64::NAN),
        "Infinity" => Ok(f64::INFINITY),
        "-Infinity" => Ok(f64::NEG_INFINITY),
        _ => parse_num(s),
    }
}

fn parse_bool(s: &str) -> Result<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "t" | "true" | "1" | "y" | "yes" | "on" => Ok(true),
        "f" | "false" | "0" | "n" | "no" | "off" => Ok(false),
        _ => Err(CodecError::InvalidSyntax(format!(
            "invalid bool literal {s:?}"
        ))),
    }
}

/// Parse the bytea text representation: `\x` hex form, or the legacy
/// escape form with `\\` and `\nnn` octal escapes.
fn parse_bytea(s: &str) -> Result<Vec<u8>> {
    if let Some(hex) = s.strip_prefix("\\x") {
        let hex: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
        if hex.len() % 2 != 0 {
            return Err(CodecError::InvalidSyntax("odd-length bytea hex data".into()));
        }
        return hex
            .chunks(2)
            .map(|pair| {
                let hi = hex_val(pair[0])?;
                let lo = hex_val(pair[1])?;
                Ok(hi << 4 | lo)
            })
            .collect();
    }

    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
        } else if i + 1 < bytes.len() && bytes[i + 1] == b'\\' {
            out.push(b'\\');
            i += 2;
        } else if i + 3 < bytes.len() {
            let oct = &s[i + 1..i + 4];
            let value = u8::from_str_radix(oct, 8).map_err(|_| {
                CodecError::InvalidSyntax(format!("invalid bytea octal escape \\{oct}"))
            })?;
            out.push(value);
            i += 4;
        } else {
            return Err(CodecError::InvalidSyntax("truncated bytea escape".into()));
        }
    }
    Ok(out)
}

fn hex_val(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(CodecError::InvalidSyntax(format!(
            "invalid bytea hex digit {:?}",
            b as char
        ))),
    }
}

// ==================== text encode ====================

/// Canonical text form of a scalar value, without any array or
/// composite quoting applied.
pub fn text_of(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Int2(v) => itoa::Buffer::new().format(*v).to_owned(),
        ScalarValue::Int4(v) => itoa::Buffer::new().format(*v).to_owned(),
        ScalarValue::Int8(v) => itoa::Buffer::new().format(*v).to_owned(),
        ScalarValue::Float4(v) => float4_text(*v),
        ScalarValue::Float8(v) => float8_text(*v),
        ScalarValue::Bool(v) => if *v { "t" } else { "f" }.to_owned(),
        ScalarValue::Text(s) => s.clone(),
        ScalarValue::Bytes(b) => {
            let mut s = String::with_capacity(2 + b.len() * 2);
            s.push_str("\\x");
            push_hex(&mut s, b);
            s
        }
        ScalarValue::Numeric(d) => d.to_string(),
        ScalarValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        ScalarValue::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        ScalarValue::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        ScalarValue::TimestampTz(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f%:z").to_string(),
        #[cfg(feature = "uuid")]
        ScalarValue::Uuid(u) => u.to_string(),
    }
}

pub(crate) fn float4_text(v: f32) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f32::INFINITY {
        "Infinity".to_owned()
    } else if v == f32::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        ryu::Buffer::new().format(v).to_owned()
    }
}

pub(crate) fn float8_text(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_owned()
    } else if v == f64::INFINITY {
        "Infinity".to_owned()
    } else if v == f64::NEG_INFINITY {
        "-Infinity".to_owned()
    } else {
        ryu::Buffer::new().format(v).to_owned()
    }
}

pub(crate) fn push_hex(out: &mut String, bytes: &[u8]) {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
}

// ==================== numeric wire format ====================

fn decode_numeric(raw: &[u8]) -> Result<ScalarValue> {
    let mut cur = Cursor::new(raw);
    let ndigits = cur.read_u16()? as usize;
    let weight = cur.read_i16()? as i32;
    let sign = cur.read_u16()?;
    let dscale = cur.read_u16()? as usize;

    match sign {
        NUMERIC_POS | NUMERIC_NEG => {}
        NUMERIC_NAN => {
            return Err(CodecError::MalformedWireData(
                "numeric NaN has no in-memory representation".into(),
            ));
        }
        other => {
            return Err(CodecError::MalformedWireData(format!(
                "invalid numeric sign word {other:#06x}"
            )));
        }
    }

    let mut groups = Vec::with_capacity(ndigits);
    for _ in 0..ndigits {
        let g = cur.read_u16()?;
        if g > 9999 {
            return Err(CodecError::MalformedWireData(format!(
                "numeric digit group {g} exceeds base 10000"
            )));
        }
        groups.push(g);
    }
    if cur.has_remaining() {
        return Err(CodecError::MalformedWireData(
            "trailing bytes after numeric digits".into(),
        ));
    }

    // The stored groups form one digit run D (4 decimal digits each);
    // its value is D * 10^(4 * (weight - ndigits + 1)).
    let mut run = String::with_capacity(ndigits * 4);
    for g in &groups {
        push_group(&mut run, *g);
    }
    let exponent = 4 * (weight - ndigits as i32 + 1);

    let (int_part, mut frac_part) = if run.is_empty() {
        ("0".to_owned(), String::new())
    } else if exponent >= 0 {
        let mut int_part = run;
        int_part.extend(std::iter::repeat('0').take(exponent as usize));
        (int_part, String::new())
    } else {
        let shift = (-exponent) as usize;
        if shift >= run.len() {
            let mut frac = String::new();
            frac.extend(std::iter::repeat('0').take(shift - run.len()));
            frac.push_str(&run);
            ("0".to_owned(), frac)
        } else {
            let split = run.len() - shift;
            let frac = run[split..].to_owned();
            run.truncate(split);
            (run, frac)
        }
    };

    // Display with exactly dscale fractional digits (Decimal caps the
    // scale at 28).
    let dscale = dscale.min(28);
    frac_part.truncate(dscale);
    while frac_part.len() < dscale {
        frac_part.push('0');
    }

    let mut text = String::with_capacity(int_part.len() + frac_part.len() + 2);
    if sign == NUMERIC_NEG {
        text.push('-');
    }
    text.push_str(int_part.trim_start_matches('0'));
    if text.is_empty() || text == "-" {
        text.push('0');
    }
    if dscale > 0 {
        text.push('.');
        text.push_str(&frac_part);
    }

    let dec = Decimal::from_str(&text)
        .map_err(|e| CodecError::MalformedWireData(format!("numeric out of range: {e}")))?;
    Ok(ScalarValue::Numeric(dec))
}

fn push_group(out: &mut String, group: u16) {
    let digits = itoa::Buffer::new().format(group).to_owned();
    for _ in digits.len()..4 {
        out.push('0');
    }
    out.push_str(&digits);
}

fn encode_numeric(value: &Decimal, out: &mut BytesMut) {
    let dscale = value.scale() as u16;
    let negative = value.is_sign_negative() && !value.is_zero();

    // Plain absolute decimal string, e.g. "1234.5000"
    let text = value.abs().to_string();
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, f),
        None => (text.as_str(), ""),
    };

    // Left-pad the integer part and right-pad the fraction to whole
    // base-10000 groups.
    let int_pad = (4 - int_part.len() % 4) % 4;
    let mut digits_text = String::with_capacity(int_pad + int_part.len() + frac_part.len() + 3);
    for _ in 0..int_pad {
        digits_text.push('0');
    }
    digits_text.push_str(int_part);
    let int_groups = digits_text.len() / 4;
    digits_text.push_str(frac_part);
    while digits_text.len() % 4 != 0 {
        digits_text.push('0');
    }

    let mut groups: Vec<u16> = digits_text
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            chunk
                .iter()
                .fold(0u16, |acc, b| acc * 10 + (b - b'0') as u16)
        })
        .collect();

    let mut weight = int_groups as i32 - 1;

    // Strip zero groups from both ends; leading strips shift the weight.
    let mut start = 0;
    while start < groups.len() && groups[start] == 0 {
        start += 1;
        weight -= 1;
    }
    groups.drain(..start);
    while groups.last() == Some(&0) {
        groups.pop();
    }
    if groups.is_empty() {
        weight = 0;
    }

    out.put_u16(groups.len() as u16);
    out.put_i16(weight as i16);
    out.put_u16(if negative { NUMERIC_NEG } else { NUMERIC_POS });
    out.put_u16(dscale);
    for g in &groups {
        out.put_u16(*g);
    }
}
