//! Wire codecs for PostgreSQL structured types.
//!
//! This crate implements the client side of PostgreSQL's array and
//! composite (record) representations, in both wire formats the
//! protocol offers:
//!
//! - binary: length-prefixed element streams with big-endian headers
//! - text: the `{...}` array literal and `(...)` record literal
//!   grammars
//!
//! Type dispatch is OID-driven through [`TypeCodecRegistry`]: a fixed
//! table covers the base types, extension codecs can be registered for
//! anything else (a `uuid` codec ships behind the `uuid` cargo
//! feature), and a pluggable [`TypeInfo`] metadata source supplies type
//! names, array element OIDs and composite attribute descriptors for
//! user-defined types.
//!
//! ```
//! use pgcodec::{array, ClientEncoding, TypeCodecRegistry};
//! use pgcodec::oid::oid;
//!
//! let registry = TypeCodecRegistry::with_builtins();
//! let array = array::text::decode(&registry, "{1,NULL,3}", oid::INT4_ARRAY, 0, 0)?;
//! assert_eq!(array.dims, vec![3]);
//!
//! let enc = ClientEncoding::utf8();
//! let wire = array::binary::encode(&registry, &enc, &array, oid::INT4_ARRAY)?;
//! let back = array::binary::decode(&registry, &enc, &wire, 0, 0)?;
//! assert_eq!(back, array);
//! # Ok::<(), pgcodec::CodecError>(())
//! ```

pub mod array;
pub mod composite;
pub mod cursor;
pub mod encoding;
pub mod error;
pub mod oid;
pub mod registry;
pub mod scalar;
pub mod value;
pub mod walker;

pub use encoding::ClientEncoding;
pub use error::{CodecError, Result};
#[cfg(feature = "uuid")]
pub use registry::UuidCodec;
pub use registry::{
    EmptyTypeInfo, ExtensionCodec, ResolvedCodec, TypeCategory, TypeCodecRegistry, TypeInfo,
};
pub use scalar::ScalarKind;
pub use value::{
    ArrayValue, Attribute, CompositeField, CompositeValue, ScalarValue, TypeDescriptor, TypeOid,
};
