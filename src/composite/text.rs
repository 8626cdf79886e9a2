//! Composite (record) text literal grammar.
//!
//! Parses and builds `(a,b,...)` literals. Inside quotes this grammar
//! accepts both a doubled quote and a backslash as escapes, which is
//! how the server's record_out/record_in pair behaves; array literals
//! accept only the backslash form, and the two grammars stay separate
//! on purpose.

use crate::error::{CodecError, Result};
use crate::registry::TypeCodecRegistry;
use crate::value::{CompositeField, CompositeValue, TypeDescriptor};

/// Decode a composite text literal against its descriptor.
///
/// An empty unquoted field is null; a quoted empty field `""` is the
/// empty string. Non-whitespace content before the opening `(` or
/// after the closing `)` is an error.
pub fn decode(
    registry: &TypeCodecRegistry,
    literal: &str,
    descriptor: &TypeDescriptor,
) -> Result<CompositeValue> {
    let raw_fields = split_fields(literal)?;

    let expected = descriptor.attribute_count();
    if raw_fields.len() != expected {
        return Err(CodecError::InvalidSyntax(format!(
            "composite {:?} declares {expected} attributes but literal has {} fields",
            descriptor.type_name,
            raw_fields.len()
        )));
    }

    let mut fields = Vec::with_capacity(expected);
    for (attr, raw) in descriptor.attributes.iter().zip(raw_fields) {
        let value = match raw {
            None => None,
            Some(text) => Some(registry.resolve(attr.oid)?.decode_text(&text)?),
        };
        fields.push(CompositeField {
            name: attr.name.clone(),
            oid: attr.oid,
            value,
        });
    }

    Ok(CompositeValue {
        type_name: descriptor.type_name.clone(),
        fields,
    })
}

/// Split a `(...)` literal into its raw field texts, `None` for null
/// fields. No type conversion happens here. Whitespace around the
/// parens is allowed; any other content outside them is an error.
pub fn split_fields(literal: &str) -> Result<Vec<Option<String>>> {
    let chars: Vec<char> = literal.trim().chars().collect();
    let len = chars.len();

    if chars.first() != Some(&'(') {
        return Err(syntax(0, "expected '('"));
    }
    if chars.last() != Some(&')') {
        return Err(syntax(len, "expected ')'"));
    }

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut was_quoted = false;
    let mut in_quotes = false;
    let mut pos = 1;

    // `()` is a single null field, consistent with the server.
    while pos < len {
        let c = chars[pos];
        match c {
            '"' if !in_quotes => {
                in_quotes = true;
                was_quoted = true;
                pos += 1;
            }
            '"' if chars.get(pos + 1) == Some(&'"') => {
                // doubled quote inside a quoted field
                current.push('"');
                pos += 2;
            }
            '"' => {
                in_quotes = false;
                pos += 1;
            }
            '\\' => {
                let next = chars
                    .get(pos + 1)
                    .ok_or_else(|| syntax(pos, "dangling backslash"))?;
                current.push(*next);
                pos += 2;
            }
            ',' | ')' if !in_quotes => {
                if c == ')' && pos != len - 1 {
                    return Err(syntax(pos, "characters after closing ')'"));
                }
                fields.push(finish_field(&mut current, &mut was_quoted));
                pos += 1;
                if c == ')' {
                    return Ok(fields);
                }
            }
            _ => {
                current.push(c);
                pos += 1;
            }
        }
    }

    Err(syntax(len, "unterminated composite literal"))
}

fn syntax(pos: usize, detail: &str) -> CodecError {
    CodecError::InvalidSyntax(format!("composite literal, offset {pos}: {detail}"))
}

fn finish_field(current: &mut String, was_quoted: &mut bool) -> Option<String> {
    let text = std::mem::take(current);
    let quoted = std::mem::replace(was_quoted, false);
    if text.is_empty() && !quoted {
        None
    } else {
        Some(text)
    }
}

/// Render a composite value as a text literal. Null fields render
/// empty; fields are quoted whenever their text contains a character
/// that would be misread bare, with embedded quotes and backslashes
/// doubled.
pub fn encode(value: &CompositeValue) -> String {
    let mut out = String::with_capacity(2 + 8 * value.fields.len());
    out.push('(');
    for (i, field) in value.fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if let Some(v) = &field.value {
            write_field(&crate::scalar::text_of(v), &mut out);
        }
    }
    out.push(')');
    out
}

fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text.chars().any(|c| {
            matches!(c, '"' | '\\' | '(' | ')' | ',') || c.is_whitespace()
        })
}

fn write_field(text: &str, out: &mut String) {
    if !needs_quoting(text) {
        out.push_str(text);
        return;
    }
    out.push('"');
    for c in text.chars() {
        if c == '"' || c == '\\' {
            out.push(c);
        }
        out.push(c);
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid::oid;
    use crate::value::{Attribute, ScalarValue};
    use pretty_assertions::assert_eq;

    fn descriptor(attrs: &[(&str, u32)]) -> TypeDescriptor {
        TypeDescriptor {
            type_name: "t".into(),
            attributes: attrs
                .iter()
                .map(|(name, oid)| Attribute {
                    name: (*name).into(),
                    type_name: crate::oid::oid_to_name(*oid).into(),
                    oid: *oid,
                })
                .collect(),
        }
    }

    #[test]
    fn test_split_simple() {
        assert_eq!(
            split_fields("(1,abc,)").unwrap(),
            vec![Some("1".into()), Some("abc".into()), None]
        );
    }

    #[test]
    fn test_split_leading_null() {
        assert_eq!(
            split_fields("(,a)").unwrap(),
            vec![None, Some("a".into())]
        );
    }

    #[test]
    fn test_split_quoted_empty_vs_null() {
        assert_eq!(
            split_fields(r#"("",)"#).unwrap(),
            vec![Some("".into()), None]
        );
    }

    #[test]
    fn test_split_doubled_quote_escape() {
        assert_eq!(
            split_fields(r#"("a""b")"#).unwrap(),
            vec![Some(r#"a"b"#.into())]
        );
    }

    #[test]
    fn test_split_backslash_escape() {
        assert_eq!(
            split_fields(r#"("a\"b","c\\d")"#).unwrap(),
            vec![Some(r#"a"b"#.into()), Some(r"c\d".into())]
        );
    }

    #[test]
    fn test_split_comma_inside_quotes() {
        assert_eq!(
            split_fields(r#"("a,b",c)"#).unwrap(),
            vec![Some("a,b".into()), Some("c".into())]
        );
    }

    #[test]
    fn test_split_junk_rejected() {
        assert!(split_fields("x(1)").is_err());
        assert!(split_fields("(1)x").is_err());
        assert!(split_fields("(1").is_err());
        assert!(split_fields("1)").is_err());
    }

    #[test]
    fn test_split_surrounding_whitespace_allowed() {
        assert_eq!(
            split_fields(" (1,a) ").unwrap(),
            vec![Some("1".into()), Some("a".into())]
        );
        assert_eq!(split_fields("\t(,)\n").unwrap(), vec![None, None]);
        // whitespace inside bare fields stays significant
        assert_eq!(
            split_fields("( 1 )").unwrap(),
            vec![Some(" 1 ".into())]
        );
    }

    #[test]
    fn test_decode_with_descriptor() {
        let reg = TypeCodecRegistry::with_builtins();
        let desc = descriptor(&[("a", oid::INT4), ("b", oid::TEXT)]);
        let value = decode(&reg, "(7,hello)", &desc).unwrap();
        assert_eq!(value.fields[0].value, Some(ScalarValue::Int4(7)));
        assert_eq!(
            value.fields[1].value,
            Some(ScalarValue::Text("hello".into()))
        );
    }

    #[test]
    fn test_decode_field_count_mismatch() {
        let reg = TypeCodecRegistry::with_builtins();
        let desc = descriptor(&[("a", oid::INT4)]);
        assert!(decode(&reg, "(1,2)", &desc).is_err());
    }

    #[test]
    fn test_encode_quoting() {
        let value = CompositeValue {
            type_name: "t".into(),
            fields: vec![
                CompositeField {
                    name: "a".into(),
                    oid: oid::INT4,
                    value: Some(ScalarValue::Int4(1)),
                },
                CompositeField {
                    name: "b".into(),
                    oid: oid::TEXT,
                    value: Some(ScalarValue::Text("x y".into())),
                },
                CompositeField {
                    name: "c".into(),
                    oid: oid::TEXT,
                    value: None,
                },
            ],
        };
        assert_eq!(encode(&value), r#"(1,"x y",)"#);
    }

    #[test]
    fn test_bool_fields_render_t_f() {
        let value = CompositeValue {
            type_name: "t".into(),
            fields: vec![
                CompositeField {
                    name: "a".into(),
                    oid: oid::BOOL,
                    value: Some(ScalarValue::Bool(true)),
                },
                CompositeField {
                    name: "b".into(),
                    oid: oid::BOOL,
                    value: Some(ScalarValue::Bool(false)),
                },
            ],
        };
        assert_eq!(encode(&value), "(t,f)");

        let reg = TypeCodecRegistry::with_builtins();
        let desc = descriptor(&[("a", oid::BOOL), ("b", oid::BOOL)]);
        let back = decode(&reg, "(t,f)", &desc).unwrap();
        assert_eq!(back.fields[0].value, Some(ScalarValue::Bool(true)));
        assert_eq!(back.fields[1].value, Some(ScalarValue::Bool(false)));
    }

    #[test]
    fn test_encode_escapes_doubled() {
        let value = CompositeValue {
            type_name: "t".into(),
            fields: vec![CompositeField {
                name: "a".into(),
                oid: oid::TEXT,
                value: Some(ScalarValue::Text(r#"a"b\c"#.into())),
            }],
        };
        assert_eq!(encode(&value), r#"("a""b\\c")"#);
    }

    #[test]
    fn test_roundtrip_through_split() {
        let value = CompositeValue {
            type_name: "t".into(),
            fields: vec![CompositeField {
                name: "a".into(),
                oid: oid::TEXT,
                value: Some(ScalarValue::Text("with \"quotes\" and ,commas,".into())),
            }],
        };
        let literal = encode(&value);
        let fields = split_fields(&literal).unwrap();
        assert_eq!(fields, vec![Some("with \"quotes\" and ,commas,".into())]);
    }
}
