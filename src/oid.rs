//! PostgreSQL Type OID Constants
//!
//! Reference: https://github.com/postgres/postgres/blob/master/src/include/catalog/pg_type.dat

/// PostgreSQL Type OIDs
#[allow(dead_code)]
pub mod oid {
    // Boolean
    pub const BOOL: u32 = 16;

    // Bytes
    pub const BYTEA: u32 = 17;

    // Characters
    pub const CHAR: u32 = 18;
    pub const NAME: u32 = 19;

    // Integers
    pub const INT8: u32 = 20; // bigint
    pub const INT2: u32 = 21; // smallint
    pub const INT4: u32 = 23; // integer

    // Text
    pub const TEXT: u32 = 25;
    pub const VARCHAR: u32 = 1043;
    pub const BPCHAR: u32 = 1042; // blank-padded char

    // OID
    pub const OID: u32 = 26;

    // JSON
    pub const JSON: u32 = 114;
    pub const JSONB: u32 = 3802;

    // Float
    pub const FLOAT4: u32 = 700;
    pub const FLOAT8: u32 = 701;

    // Numeric
    pub const NUMERIC: u32 = 1700;

    // Date/Time
    pub const DATE: u32 = 1082;
    pub const TIME: u32 = 1083;
    pub const TIMESTAMP: u32 = 1114;
    pub const TIMESTAMPTZ: u32 = 1184;

    // Geometric (only the delimiter matters here)
    pub const BOX: u32 = 603;

    // UUID
    pub const UUID: u32 = 2950;

    // Pseudo-type for anonymous records
    pub const RECORD: u32 = 2249;

    // Arrays (defined separately from their element types in pg_type)
    pub const BOOL_ARRAY: u32 = 1000;
    pub const BYTEA_ARRAY: u32 = 1001;
    pub const CHAR_ARRAY: u32 = 1002;
    pub const NAME_ARRAY: u32 = 1003;
    pub const INT2_ARRAY: u32 = 1005;
    pub const INT4_ARRAY: u32 = 1007;
    pub const TEXT_ARRAY: u32 = 1009;
    pub const VARCHAR_ARRAY: u32 = 1015;
    pub const INT8_ARRAY: u32 = 1016;
    pub const FLOAT4_ARRAY: u32 = 1021;
    pub const FLOAT8_ARRAY: u32 = 1022;
    pub const BOX_ARRAY: u32 = 1020;
    pub const BPCHAR_ARRAY: u32 = 1014;
    pub const OID_ARRAY: u32 = 1028;
    pub const DATE_ARRAY: u32 = 1182;
    pub const TIME_ARRAY: u32 = 1183;
    pub const TIMESTAMP_ARRAY: u32 = 1115;
    pub const TIMESTAMPTZ_ARRAY: u32 = 1185;
    pub const NUMERIC_ARRAY: u32 = 1231;
    pub const JSON_ARRAY: u32 = 199;
    pub const JSONB_ARRAY: u32 = 3807;
    pub const UUID_ARRAY: u32 = 2951;
}

/// Map OID to a human-readable type name
pub fn oid_to_name(oid: u32) -> &'static str {
    match oid {
        oid::BOOL => "bool",
        oid::BYTEA => "bytea",
        oid::CHAR => "char",
        oid::NAME => "name",
        oid::INT8 => "int8",
        oid::INT2 => "int2",
        oid::INT4 => "int4",
        oid::TEXT => "text",
        oid::VARCHAR => "varchar",
        oid::BPCHAR => "bpchar",
        oid::OID => "oid",
        oid::JSON => "json",
        oid::JSONB => "jsonb",
        oid::FLOAT4 => "float4",
        oid::FLOAT8 => "float8",
        oid::NUMERIC => "numeric",
        oid::DATE => "date",
        oid::TIME => "time",
        oid::TIMESTAMP => "timestamp",
        oid::TIMESTAMPTZ => "timestamptz",
        oid::BOX => "box",
        oid::UUID => "uuid",
        oid::RECORD => "record",
        oid::BOOL_ARRAY => "bool[]",
        oid::BYTEA_ARRAY => "bytea[]",
        oid::INT2_ARRAY => "int2[]",
        oid::INT4_ARRAY => "int4[]",
        oid::INT8_ARRAY => "int8[]",
        oid::TEXT_ARRAY => "text[]",
        oid::VARCHAR_ARRAY => "varchar[]",
        oid::BPCHAR_ARRAY => "bpchar[]",
        oid::OID_ARRAY => "oid[]",
        oid::FLOAT4_ARRAY => "float4[]",
        oid::FLOAT8_ARRAY => "float8[]",
        oid::BOX_ARRAY => "box[]",
        oid::NUMERIC_ARRAY => "numeric[]",
        oid::DATE_ARRAY => "date[]",
        oid::TIME_ARRAY => "time[]",
        oid::TIMESTAMP_ARRAY => "timestamp[]",
        oid::TIMESTAMPTZ_ARRAY => "timestamptz[]",
        oid::JSON_ARRAY => "json[]",
        oid::JSONB_ARRAY => "jsonb[]",
        oid::UUID_ARRAY => "uuid[]",
        _ => "unknown",
    }
}

/// Element OID for a built-in array OID, if known.
pub fn element_of(array_oid: u32) -> Option<u32> {
    let elem = match array_oid {
        oid::BOOL_ARRAY => oid::BOOL,
        oid::BYTEA_ARRAY => oid::BYTEA,
        oid::CHAR_ARRAY => oid::CHAR,
        oid::NAME_ARRAY => oid::NAME,
        oid::INT2_ARRAY => oid::INT2,
        oid::INT4_ARRAY => oid::INT4,
        oid::INT8_ARRAY => oid::INT8,
        oid::TEXT_ARRAY => oid::TEXT,
        oid::VARCHAR_ARRAY => oid::VARCHAR,
        oid::BPCHAR_ARRAY => oid::BPCHAR,
        oid::OID_ARRAY => oid::OID,
        oid::FLOAT4_ARRAY => oid::FLOAT4,
        oid::FLOAT8_ARRAY => oid::FLOAT8,
        oid::BOX_ARRAY => oid::BOX,
        oid::NUMERIC_ARRAY => oid::NUMERIC,
        oid::DATE_ARRAY => oid::DATE,
        oid::TIME_ARRAY => oid::TIME,
        oid::TIMESTAMP_ARRAY => oid::TIMESTAMP,
        oid::TIMESTAMPTZ_ARRAY => oid::TIMESTAMPTZ,
        oid::JSON_ARRAY => oid::JSON,
        oid::JSONB_ARRAY => oid::JSONB,
        oid::UUID_ARRAY => oid::UUID,
        _ => return None,
    };
    Some(elem)
}

/// Check if an OID represents a built-in array type
pub fn is_array_oid(oid: u32) -> bool {
    element_of(oid).is_some()
}

/// Element delimiter used in the array text representation.
///
/// Everything uses `,` except the box family, which uses `;` because
/// box literals contain commas themselves.
pub fn array_delimiter(array_oid: u32) -> char {
    match array_oid {
        oid::BOX_ARRAY => ';',
        _ => ',',
    }
}
