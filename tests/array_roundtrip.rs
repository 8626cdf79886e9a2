//! End-to-end array codec coverage across both wire formats.

use pgcodec::oid::oid;
use pgcodec::{array, scalar, ArrayValue, ClientEncoding, ScalarKind, ScalarValue, TypeCodecRegistry};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn registry() -> TypeCodecRegistry {
    TypeCodecRegistry::with_builtins()
}

fn int4_array(dims: Vec<usize>, values: Vec<Option<i32>>) -> ArrayValue {
    ArrayValue::new(
        dims,
        oid::INT4,
        values.into_iter().map(|v| v.map(ScalarValue::Int4)).collect(),
    )
    .unwrap()
}

#[test]
fn binary_and_text_agree_on_nulls() {
    let reg = registry();
    let enc = ClientEncoding::utf8();
    let array = int4_array(vec![3], vec![Some(1), None, Some(3)]);

    let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
    let from_binary = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();

    let literal = array::text::encode(&array, oid::INT4_ARRAY).unwrap();
    assert_eq!(literal, "{1,NULL,3}");
    let from_text = array::text::decode(&reg, &literal, oid::INT4_ARRAY, 0, 0).unwrap();

    assert_eq!(from_binary, array);
    assert_eq!(from_text, array);
}

#[test]
fn quoted_null_is_a_string() {
    let reg = registry();
    let array = array::text::decode(&reg, r#"{"NULL"}"#, oid::TEXT_ARRAY, 0, 0).unwrap();
    assert_eq!(
        array.elements,
        vec![Some(ScalarValue::Text("NULL".into()))]
    );

    // and it survives re-encoding without collapsing into a null
    let literal = array::text::encode(&array, oid::TEXT_ARRAY).unwrap();
    assert_eq!(literal, r#"{"NULL"}"#);
}

#[test]
fn empty_array_both_formats() {
    let reg = registry();
    let enc = ClientEncoding::utf8();

    let from_text = array::text::decode(&reg, "{}", oid::INT4_ARRAY, 0, 0).unwrap();
    assert!(from_text.is_empty());

    let empty = ArrayValue::new(vec![], oid::INT4, vec![]).unwrap();
    let wire = array::binary::encode(&reg, &enc, &empty, oid::INT4_ARRAY).unwrap();
    let from_binary = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
    assert!(from_binary.is_empty());

    assert_eq!(array::text::encode(&empty, oid::INT4_ARRAY).unwrap(), "{}");
}

#[test]
fn two_dimensional_shape() {
    let reg = registry();
    let enc = ClientEncoding::utf8();

    let array = array::text::decode(&reg, "{{1,2},{3,4}}", oid::INT4_ARRAY, 0, 0).unwrap();
    assert_eq!(array.dims, vec![2, 2]);
    assert_eq!(
        array.elements,
        vec![
            Some(ScalarValue::Int4(1)),
            Some(ScalarValue::Int4(2)),
            Some(ScalarValue::Int4(3)),
            Some(ScalarValue::Int4(4)),
        ]
    );

    let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
    let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
    assert_eq!(back, array);
}

#[test]
fn slice_matches_across_formats() {
    let reg = registry();
    let enc = ClientEncoding::utf8();
    let array = int4_array(vec![4], vec![Some(10), Some(20), Some(30), Some(40)]);

    let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
    let literal = array::text::encode(&array, oid::INT4_ARRAY).unwrap();

    let from_binary = array::binary::decode(&reg, &enc, &wire, 2, 2).unwrap();
    let from_text = array::text::decode(&reg, &literal, oid::INT4_ARRAY, 2, 2).unwrap();

    let expected = int4_array(vec![2], vec![Some(20), Some(30)]);
    assert_eq!(from_binary, expected);
    assert_eq!(from_text, expected);
}

#[test]
fn deep_shapes_roundtrip_both_formats() {
    let reg = registry();
    let enc = ClientEncoding::utf8();

    for dims in [vec![2, 2, 2], vec![2, 1, 3, 2]] {
        let total: usize = dims.iter().product();
        let values: Vec<Option<i32>> = (0..total)
            .map(|i| if i % 5 == 4 { None } else { Some(i as i32) })
            .collect();
        let array = int4_array(dims.clone(), values);

        let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
        let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        assert_eq!(back, array, "binary, dims {dims:?}");

        let literal = array::text::encode(&array, oid::INT4_ARRAY).unwrap();
        let back = array::text::decode(&reg, &literal, oid::INT4_ARRAY, 0, 0).unwrap();
        assert_eq!(back, array, "text, dims {dims:?}");
    }
}

#[test]
fn mixed_scalar_kinds_roundtrip_binary() {
    let reg = registry();
    let enc = ClientEncoding::utf8();

    let cases: Vec<(u32, u32, Vec<Option<ScalarValue>>)> = vec![
        (
            oid::INT2,
            oid::INT2_ARRAY,
            vec![Some(ScalarValue::Int2(-1)), None],
        ),
        (
            oid::INT8,
            oid::INT8_ARRAY,
            vec![Some(ScalarValue::Int8(i64::MAX)), Some(ScalarValue::Int8(0))],
        ),
        (
            oid::FLOAT8,
            oid::FLOAT8_ARRAY,
            vec![Some(ScalarValue::Float8(1.25)), None],
        ),
        (
            oid::BOOL,
            oid::BOOL_ARRAY,
            vec![Some(ScalarValue::Bool(true)), Some(ScalarValue::Bool(false))],
        ),
        (
            oid::BYTEA,
            oid::BYTEA_ARRAY,
            vec![Some(ScalarValue::Bytes(vec![0, 1, 255])), None],
        ),
    ];

    for (element_oid, array_oid, elements) in cases {
        let n = elements.len();
        let array = ArrayValue::new(vec![n], element_oid, elements).unwrap();
        let wire = array::binary::encode(&reg, &enc, &array, array_oid).unwrap();
        let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        assert_eq!(back, array, "oid {element_oid}");
    }
}

#[test]
fn all_base_kinds_roundtrip_both_formats() {
    let reg = registry();
    let enc = ClientEncoding::utf8();

    let cases: [(ScalarKind, u32, u32, &[&str]); 8] = [
        (ScalarKind::Float4, oid::FLOAT4, oid::FLOAT4_ARRAY, &["1.5", "-0.25"]),
        (
            ScalarKind::Numeric,
            oid::NUMERIC,
            oid::NUMERIC_ARRAY,
            &["19.99", "-0.0001", "42"],
        ),
        (
            ScalarKind::Date,
            oid::DATE,
            oid::DATE_ARRAY,
            &["2024-03-01", "1999-12-31"],
        ),
        (
            ScalarKind::Time,
            oid::TIME,
            oid::TIME_ARRAY,
            &["12:30:45.5", "00:00:00"],
        ),
        (
            ScalarKind::Timestamp,
            oid::TIMESTAMP,
            oid::TIMESTAMP_ARRAY,
            &["2024-06-01 12:30:45.5"],
        ),
        (
            ScalarKind::TimestampTz,
            oid::TIMESTAMPTZ,
            oid::TIMESTAMPTZ_ARRAY,
            &["2024-06-01 12:30:45.5+00:00"],
        ),
        (ScalarKind::Json, oid::JSON, oid::JSON_ARRAY, &[r#"{"a":1}"#]),
        (ScalarKind::Jsonb, oid::JSONB, oid::JSONB_ARRAY, &["[1,2]"]),
    ];

    for (kind, element_oid, array_oid, literals) in cases {
        let mut elements: Vec<Option<ScalarValue>> = literals
            .iter()
            .map(|s| scalar::decode_text(kind, s).map(Some).unwrap())
            .collect();
        elements.push(None);
        let array = ArrayValue::new(vec![elements.len()], element_oid, elements).unwrap();

        let wire = array::binary::encode(&reg, &enc, &array, array_oid).unwrap();
        let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        assert_eq!(back, array, "binary {kind:?}");

        let literal = array::text::encode(&array, array_oid).unwrap();
        let back = array::text::decode(&reg, &literal, array_oid, 0, 0).unwrap();
        assert_eq!(back, array, "text {kind:?}");
    }
}

#[test]
fn string_escapes_roundtrip_text() {
    let reg = registry();
    let tricky = vec![
        Some(ScalarValue::Text(r#"quote " backslash \ done"#.into())),
        Some(ScalarValue::Text("braces {and} commas, here".into())),
        Some(ScalarValue::Text(String::new())),
        None,
    ];
    let array = ArrayValue::new(vec![4], oid::TEXT, tricky).unwrap();
    let literal = array::text::encode(&array, oid::TEXT_ARRAY).unwrap();
    let back = array::text::decode(&reg, &literal, oid::TEXT_ARRAY, 0, 0).unwrap();
    assert_eq!(back, array);
}

proptest! {
    #[test]
    fn prop_int4_binary_roundtrip(values in proptest::collection::vec(
        proptest::option::of(any::<i32>()), 0..64)
    ) {
        let reg = registry();
        let enc = ClientEncoding::utf8();
        let dims = if values.is_empty() { vec![] } else { vec![values.len()] };
        let array = int4_array(dims, values);
        let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
        let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        prop_assert_eq!(back, array);
    }

    #[test]
    fn prop_text_roundtrip_arbitrary_strings(values in proptest::collection::vec(
        proptest::option::of(".*"), 1..16)
    ) {
        let reg = registry();
        let elements: Vec<Option<ScalarValue>> = values
            .into_iter()
            .map(|v| v.map(ScalarValue::Text))
            .collect();
        let array = ArrayValue::new(vec![elements.len()], oid::TEXT, elements).unwrap();
        let literal = array::text::encode(&array, oid::TEXT_ARRAY).unwrap();
        let back = array::text::decode(&reg, &literal, oid::TEXT_ARRAY, 0, 0).unwrap();
        prop_assert_eq!(back, array);
    }

    #[test]
    fn prop_rectangular_shapes(rows in 1usize..5, cols in 1usize..5) {
        let reg = registry();
        let enc = ClientEncoding::utf8();
        let values: Vec<Option<i32>> = (0..rows * cols).map(|i| Some(i as i32)).collect();
        let array = int4_array(vec![rows, cols], values);

        let wire = array::binary::encode(&reg, &enc, &array, oid::INT4_ARRAY).unwrap();
        let back = array::binary::decode(&reg, &enc, &wire, 0, 0).unwrap();
        prop_assert_eq!(&back, &array);

        let literal = array::text::encode(&array, oid::INT4_ARRAY).unwrap();
        let back = array::text::decode(&reg, &literal, oid::INT4_ARRAY, 0, 0).unwrap();
        prop_assert_eq!(back, array);
    }
}
