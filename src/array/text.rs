//! Array text literal grammar.
//!
//! Parses and builds literals of the form `{a,b,{c,d}}`, with an
//! optional `[lower:upper]=` dimension-bounds prefix that is accepted
//! and discarded. Inside double quotes the only escape is a backslash;
//! a doubled quote is NOT an escape in array literals (composites
//! differ, deliberately).

use crate::error::{CodecError, Result};
use crate::registry::{ResolvedCodec, TypeCodecRegistry};
use crate::scalar;
use crate::value::{ArrayValue, ScalarValue, TypeOid};
use crate::walker::{self, Node};

/// Whitespace the server's array_in accepts between tokens.
fn is_array_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0B' | '\x0C')
}

// ==================== decode ====================

/// Decode an array text literal.
///
/// `index`/`count` slice the outermost dimension 1-based before any
/// leaf conversion happens, so elements outside the slice are never
/// converted (and never fail conversion). The element type is resolved
/// from the declared array OID.
pub fn decode(
    registry: &TypeCodecRegistry,
    literal: &str,
    array_oid: TypeOid,
    index: usize,
    count: usize,
) -> Result<ArrayValue> {
    let element_oid = registry.element_oid(array_oid)?;
    let codec = registry.resolve(element_oid)?;
    let delimiter = crate::oid::array_delimiter(array_oid);

    let chars: Vec<char> = literal.chars().collect();
    let mut pos = 0;

    skip_whitespace(&chars, &mut pos);
    skip_bounds_prefix(&chars, &mut pos)?;
    skip_whitespace(&chars, &mut pos);

    if chars.get(pos) != Some(&'{') {
        return Err(syntax(pos, "expected '{'"));
    }

    // Declared dimensionality is the run of leading braces.
    let mut declared_depth = 0;
    let mut probe = pos;
    while chars.get(probe) == Some(&'{') {
        declared_depth += 1;
        probe += 1;
        skip_whitespace(&chars, &mut probe);
    }

    let top = parse_list(&chars, &mut pos, delimiter)?;
    skip_whitespace(&chars, &mut pos);
    if pos != chars.len() {
        return Err(syntax(pos, "trailing characters after closing '}'"));
    }

    let mut top = top;
    if index > 0 || count > 0 {
        let skip = index.saturating_sub(1).min(top.len());
        let available = top.len() - skip;
        let take = if count > 0 { count.min(available) } else { available };
        top = top.into_iter().skip(skip).take(take).collect();
    }

    let (dims, raw_leaves) = walker::flatten(top, declared_depth)?;

    let mut elements = Vec::with_capacity(raw_leaves.len());
    for leaf in raw_leaves {
        elements.push(match leaf {
            None => None,
            Some(text) => Some(convert_leaf(&codec, &text)?),
        });
    }
    ArrayValue::new(dims, element_oid, elements)
}

fn convert_leaf(codec: &ResolvedCodec, text: &str) -> Result<ScalarValue> {
    codec.decode_text(text)
}

/// `[1:3][1:2]=` style prefix. Bounds are parsed for well-formedness
/// and discarded; the shape comes from the braces alone.
fn skip_bounds_prefix(chars: &[char], pos: &mut usize) -> Result<()> {
    if chars.get(*pos) != Some(&'[') {
        return Ok(());
    }
    loop {
        match chars.get(*pos) {
            Some('[') => {
                let close = chars[*pos..]
                    .iter()
                    .position(|&c| c == ']')
                    .ok_or_else(|| syntax(*pos, "unterminated dimension bounds"))?;
                *pos += close + 1;
                skip_whitespace(chars, pos);
            }
            Some('=') => {
                *pos += 1;
                return Ok(());
            }
            _ => return Err(syntax(*pos, "expected '=' after dimension bounds")),
        }
    }
}

/// Parse one `{...}` list; `pos` sits on the opening brace on entry and
/// one past the closing brace on exit.
fn parse_list(chars: &[char], pos: &mut usize, delimiter: char) -> Result<Vec<Node<String>>> {
    debug_assert_eq!(chars.get(*pos), Some(&'{'));
    *pos += 1;

    let mut items = Vec::new();
    skip_whitespace(chars, pos);
    if chars.get(*pos) == Some(&'}') {
        *pos += 1;
        return Ok(items);
    }

    loop {
        skip_whitespace(chars, pos);
        match chars.get(*pos) {
            Some('{') => items.push(Node::List(parse_list(chars, pos, delimiter)?)),
            Some(_) => items.push(parse_leaf(chars, pos, delimiter)?),
            None => return Err(syntax(*pos, "unterminated array literal")),
        }
        skip_whitespace(chars, pos);
        match chars.get(*pos) {
            Some(&c) if c == delimiter => {
                *pos += 1;
            }
            Some('}') => {
                *pos += 1;
                return Ok(items);
            }
            Some(&c) => return Err(syntax(*pos, &format!("unexpected character '{c}'"))),
            None => return Err(syntax(*pos, "unterminated array literal")),
        }
    }
}

/// One scalar token, quoted or bare. A bare token runs to the next
/// delimiter or closing brace with trailing whitespace trimmed; the
/// bare word NULL (any case) is the null literal, an empty bare token
/// is null too, and `""` is the empty string.
fn parse_leaf(chars: &[char], pos: &mut usize, delimiter: char) -> Result<Node<String>> {
    if chars.get(*pos) == Some(&'"') {
        *pos += 1;
        let mut out = String::new();
        loop {
            match chars.get(*pos) {
                Some('\\') => {
                    *pos += 1;
                    let c = chars
                        .get(*pos)
                        .ok_or_else(|| syntax(*pos, "dangling backslash"))?;
                    out.push(*c);
                    *pos += 1;
                }
                Some('"') => {
                    *pos += 1;
                    return Ok(Node::Leaf(Some(out)));
                }
                Some(&c) => {
                    out.push(c);
                    *pos += 1;
                }
                None => return Err(syntax(*pos, "unterminated quoted element")),
            }
        }
    }

    let start = *pos;
    while let Some(&c) = chars.get(*pos) {
        if c == delimiter || c == '}' {
            break;
        }
        if c == '{' || c == '"' {
            return Err(syntax(*pos, &format!("unexpected character '{c}'")));
        }
        *pos += 1;
    }
    let mut end = *pos;
    while end > start && is_array_whitespace(chars[end - 1]) {
        end -= 1;
    }
    let token: String = chars[start..end].iter().collect();
    if token.is_empty() || token.eq_ignore_ascii_case("NULL") {
        Ok(Node::Leaf(None))
    } else {
        Ok(Node::Leaf(Some(token)))
    }
}

fn skip_whitespace(chars: &[char], pos: &mut usize) {
    while chars.get(*pos).copied().is_some_and(is_array_whitespace) {
        *pos += 1;
    }
}

fn syntax(pos: usize, detail: &str) -> CodecError {
    CodecError::InvalidSyntax(format!("array literal, offset {pos}: {detail}"))
}

// ==================== encode ====================

/// Render an array as a text literal.
///
/// Numbers go unquoted, booleans render as `1`/`0`, floats and
/// numerics are quoted only when they contain `.`, `e` or `E`, and
/// everything string-like is always quoted with backslash escapes.
pub fn encode(array: &ArrayValue, array_oid: TypeOid) -> Result<String> {
    let delimiter = crate::oid::array_delimiter(array_oid);
    let mut out = String::new();
    if array.dims.is_empty() {
        out.push_str("{}");
        return Ok(out);
    }
    write_level(&array.dims, &array.elements, delimiter, &mut out)?;
    Ok(out)
}

fn write_level(
    dims: &[usize],
    elements: &[Option<ScalarValue>],
    delimiter: char,
    out: &mut String,
) -> Result<()> {
    out.push('{');
    if dims.len() == 1 {
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            match element {
                None => out.push_str("NULL"),
                Some(value) => write_element(value, out)?,
            }
        }
    } else {
        for (i, chunk) in walker::rows(dims, elements).enumerate() {
            if i > 0 {
                out.push(delimiter);
            }
            write_level(&dims[1..], chunk, delimiter, out)?;
        }
    }
    out.push('}');
    Ok(())
}

fn write_element(value: &ScalarValue, out: &mut String) -> Result<()> {
    match value {
        ScalarValue::Int2(v) => {
            out.push_str(itoa::Buffer::new().format(*v));
        }
        ScalarValue::Int4(v) => {
            out.push_str(itoa::Buffer::new().format(*v));
        }
        ScalarValue::Int8(v) => {
            out.push_str(itoa::Buffer::new().format(*v));
        }
        ScalarValue::Bool(v) => out.push(if *v { '1' } else { '0' }),
        ScalarValue::Float4(v) => quote_if_fractional(&scalar::float4_text(*v), out),
        ScalarValue::Float8(v) => quote_if_fractional(&scalar::float8_text(*v), out),
        ScalarValue::Numeric(v) => quote_if_fractional(&v.to_string(), out),
        other => escape_element(&scalar::text_of(other), out),
    }
    Ok(())
}

/// Plain decimal integers need no quoting; anything with a fractional
/// point or exponent gets quoted so the server never misreads it.
fn quote_if_fractional(text: &str, out: &mut String) {
    if text.contains(['.', 'e', 'E']) {
        escape_element(text, out);
    } else {
        out.push_str(text);
    }
}

/// Quote a string element, backslash-escaping quotes and backslashes.
pub(crate) fn escape_element(text: &str, out: &mut String) {
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ClientEncoding;
    use crate::oid::oid;
    use pretty_assertions::assert_eq;

    fn registry() -> TypeCodecRegistry {
        TypeCodecRegistry::with_builtins()
    }

    fn int4(v: i32) -> Option<ScalarValue> {
        Some(ScalarValue::Int4(v))
    }

    fn text(v: &str) -> Option<ScalarValue> {
        Some(ScalarValue::Text(v.to_string()))
    }

    #[test]
    fn test_simple_list() {
        let reg = registry();
        let array = decode(&reg, "{1,2,3}", oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(array.dims, vec![3]);
        assert_eq!(array.elements, vec![int4(1), int4(2), int4(3)]);
    }

    #[test]
    fn test_null_semantics() {
        let reg = registry();
        // bare NULL is null, quoted "NULL" is the four-char string,
        // an empty bare token is null, "" is the empty string
        let array = decode(&reg, r#"{NULL,"NULL",,""}"#, oid::TEXT_ARRAY, 0, 0).unwrap();
        assert_eq!(array.elements, vec![None, text("NULL"), None, text("")]);
    }

    #[test]
    fn test_quoted_escapes() {
        let reg = registry();
        let array = decode(&reg, r#"{"a\"b","c\\d"}"#, oid::TEXT_ARRAY, 0, 0).unwrap();
        assert_eq!(array.elements, vec![text(r#"a"b"#), text(r"c\d")]);
    }

    #[test]
    fn test_bare_token_whitespace_trimmed() {
        let reg = registry();
        let array = decode(&reg, "{ 1 ,\t2 }", oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(array.elements, vec![int4(1), int4(2)]);
    }

    #[test]
    fn test_bounds_prefix_discarded() {
        let reg = registry();
        let array = decode(&reg, "[2:4]={5,6,7}", oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(array.dims, vec![3]);
        assert_eq!(array.elements, vec![int4(5), int4(6), int4(7)]);
    }

    #[test]
    fn test_nested() {
        let reg = registry();
        let array = decode(&reg, "{{1,2},{3,4}}", oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(array.dims, vec![2, 2]);
        assert_eq!(array.elements, vec![int4(1), int4(2), int4(3), int4(4)]);
    }

    #[test]
    fn test_ragged_nested_rejected() {
        let reg = registry();
        assert!(decode(&reg, "{{1},{2,3}}", oid::INT4_ARRAY, 0, 0).is_err());
    }

    #[test]
    fn test_empty_array() {
        let reg = registry();
        let array = decode(&reg, "{}", oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(array.dims, vec![0]);
        assert!(array.is_empty());
    }

    #[test]
    fn test_box_uses_semicolon_delimiter() {
        let reg = registry();
        let array = decode(&reg, "{(1,2),(3,4);(5,6),(7,8)}", oid::BOX_ARRAY, 0, 0).unwrap();
        assert_eq!(array.dims, vec![2]);
        assert_eq!(
            array.elements,
            vec![text("(1,2),(3,4)"), text("(5,6),(7,8)")]
        );
    }

    #[test]
    fn test_slice_before_conversion() {
        let reg = registry();
        // the out-of-slice junk token would fail int4 conversion
        let array = decode(&reg, "{junk,20,30,junk}", oid::INT4_ARRAY, 2, 2).unwrap();
        assert_eq!(array.elements, vec![int4(20), int4(30)]);
    }

    #[test]
    fn test_trailing_garbage_rejected() {
        let reg = registry();
        assert!(decode(&reg, "{1,2}x", oid::INT4_ARRAY, 0, 0).is_err());
        assert!(decode(&reg, "{1,2", oid::INT4_ARRAY, 0, 0).is_err());
        assert!(decode(&reg, "1,2}", oid::INT4_ARRAY, 0, 0).is_err());
    }

    #[test]
    fn test_encode_ints_unquoted() {
        let array =
            ArrayValue::new(vec![3], oid::INT4, vec![int4(1), None, int4(3)]).unwrap();
        assert_eq!(encode(&array, oid::INT4_ARRAY).unwrap(), "{1,NULL,3}");
    }

    #[test]
    fn test_encode_strings_quoted() {
        let array = ArrayValue::new(
            vec![2],
            oid::TEXT,
            vec![text(r#"a"b"#), text("plain")],
        )
        .unwrap();
        assert_eq!(
            encode(&array, oid::TEXT_ARRAY).unwrap(),
            r#"{"a\"b","plain"}"#
        );
    }

    #[test]
    fn test_encode_floats() {
        let array = ArrayValue::new(
            vec![2],
            oid::FLOAT8,
            vec![Some(ScalarValue::Float8(1.5)), Some(ScalarValue::Float8(2.0))],
        )
        .unwrap();
        let lit = encode(&array, oid::FLOAT8_ARRAY).unwrap();
        assert_eq!(lit, r#"{"1.5","2.0"}"#);
    }

    #[test]
    fn test_encode_bool_as_digit() {
        let array = ArrayValue::new(
            vec![2],
            oid::BOOL,
            vec![Some(ScalarValue::Bool(true)), Some(ScalarValue::Bool(false))],
        )
        .unwrap();
        assert_eq!(encode(&array, oid::BOOL_ARRAY).unwrap(), "{1,0}");
    }

    #[test]
    fn test_encode_nested() {
        let array = ArrayValue::new(
            vec![2, 2],
            oid::INT4,
            vec![int4(1), int4(2), int4(3), int4(4)],
        )
        .unwrap();
        assert_eq!(encode(&array, oid::INT4_ARRAY).unwrap(), "{{1,2},{3,4}}");
    }

    #[test]
    fn test_text_roundtrip_through_binary_peer() {
        // the text decode of a literal and the binary decode of the
        // equivalent wire bytes agree on the logical value
        let reg = registry();
        let enc = ClientEncoding::utf8();
        let from_text = decode(&reg, "{10,NULL,30}", oid::INT4_ARRAY, 0, 0).unwrap();
        let wire =
            crate::array::binary::encode(&reg, &enc, &from_text, oid::INT4_ARRAY).unwrap();
        let from_binary = crate::array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        assert_eq!(from_text.elements, from_binary.elements);
    }
}
