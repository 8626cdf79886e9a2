//! OID-driven codec resolution.
//!
//! Dispatch order mirrors the driver it serves:
//! 1. fixed base-type table ([`ScalarKind::for_oid`])
//! 2. externally registered extension codecs
//! 3. type-name lookup through the metadata cache: character-like
//!    categories fall back to text passthrough, composite categories
//!    route to the composite codec, anything else resolvable becomes a
//!    name-keyed generic fallback.
//!
//! The registry is mutable only during a single-threaded initialization
//! window (extension registration takes `&mut self`); afterwards it is
//! read-only and safe to share across concurrent decodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::BytesMut;
use tracing::debug;

use crate::cursor::Cursor;
use crate::encoding::ClientEncoding;
use crate::error::{CodecError, Result};
use crate::oid;
use crate::scalar::{self, ScalarKind};
use crate::value::{ScalarValue, TypeDescriptor, TypeOid};

/// Coarse type category used for fallback routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    /// char/varchar-like types: values are plain text.
    Character,
    /// Composite (record) types with a fixed attribute list.
    Composite,
    Other,
}

/// Metadata-cache surface consumed by this layer.
///
/// The cache itself lives in the surrounding driver and may round-trip
/// to the server on a miss; from here it is a read-only collaborator.
pub trait TypeInfo: Send + Sync {
    fn type_name(&self, type_oid: TypeOid) -> Option<String>;
    fn oid_of(&self, name: &str) -> Option<TypeOid>;
    fn array_element_oid(&self, array_oid: TypeOid) -> Option<TypeOid>;
    fn type_category(&self, name: &str) -> Option<TypeCategory>;
    fn struct_descriptor(&self, name: &str) -> Option<TypeDescriptor>;
}

/// A `TypeInfo` that knows nothing beyond the built-in tables. Useful
/// for base-type-only traffic and for tests.
#[derive(Debug, Default)]
pub struct EmptyTypeInfo;

impl TypeInfo for EmptyTypeInfo {
    fn type_name(&self, _type_oid: TypeOid) -> Option<String> {
        None
    }
    fn oid_of(&self, _name: &str) -> Option<TypeOid> {
        None
    }
    fn array_element_oid(&self, _array_oid: TypeOid) -> Option<TypeOid> {
        None
    }
    fn type_category(&self, _name: &str) -> Option<TypeCategory> {
        None
    }
    fn struct_descriptor(&self, _name: &str) -> Option<TypeDescriptor> {
        None
    }
}

/// Codec for a type this crate has no built-in support for, registered
/// by the embedding driver (uuid, custom domains, ...).
pub trait ExtensionCodec: fmt::Debug + Send + Sync {
    fn decode_binary(&self, raw: &[u8]) -> Result<ScalarValue>;
    fn decode_text(&self, text: &str) -> Result<ScalarValue>;
    fn encode_binary(&self, value: &ScalarValue, out: &mut BytesMut) -> Result<()>;
    fn encode_text(&self, value: &ScalarValue) -> Result<String>;

    /// Fixed wire width, if the type has one. Used for buffer
    /// preallocation only.
    fn binary_width(&self) -> Option<usize> {
        None
    }
}

/// Outcome of registry dispatch for one OID.
#[derive(Debug, Clone)]
pub enum ResolvedCodec {
    Scalar(ScalarKind),
    Extension(Arc<dyn ExtensionCodec>),
    /// Character-like category: values pass through as text.
    TextPassthrough,
    Composite(TypeDescriptor),
    /// Resolvable name without further structure: text passes through,
    /// binary payloads surface as raw bytes.
    Named(String),
}

impl ResolvedCodec {
    /// Decode one value of this type from `len` wire bytes.
    pub fn decode_binary(
        &self,
        len: usize,
        cur: &mut Cursor<'_>,
        enc: &ClientEncoding,
    ) -> Result<ScalarValue> {
        match self {
            ResolvedCodec::Scalar(kind) => scalar::decode_binary(*kind, len, cur, enc),
            ResolvedCodec::Extension(ext) => ext.decode_binary(cur.take(len)?),
            ResolvedCodec::TextPassthrough => {
                Ok(ScalarValue::Text(enc.decode(cur.take(len)?)?.to_owned()))
            }
            ResolvedCodec::Composite(_) | ResolvedCodec::Named(_) => {
                Ok(ScalarValue::Bytes(cur.take(len)?.to_vec()))
            }
        }
    }

    /// Decode one value of this type from its text representation.
    pub fn decode_text(&self, text: &str) -> Result<ScalarValue> {
        match self {
            ResolvedCodec::Scalar(kind) => scalar::decode_text(*kind, text),
            ResolvedCodec::Extension(ext) => ext.decode_text(text),
            ResolvedCodec::TextPassthrough
            | ResolvedCodec::Composite(_)
            | ResolvedCodec::Named(_) => Ok(ScalarValue::Text(text.to_owned())),
        }
    }

    /// Append the binary payload of one value; the caller writes the
    /// length prefix.
    pub fn encode_binary(
        &self,
        value: &ScalarValue,
        enc: &ClientEncoding,
        out: &mut BytesMut,
    ) -> Result<()> {
        match self {
            ResolvedCodec::Scalar(kind) => scalar::encode_binary(*kind, value, enc, out),
            ResolvedCodec::Extension(ext) => ext.encode_binary(value, out),
            ResolvedCodec::TextPassthrough
            | ResolvedCodec::Composite(_)
            | ResolvedCodec::Named(_) => match value {
                ScalarValue::Text(s) => {
                    out.extend_from_slice(&enc.encode(s)?);
                    Ok(())
                }
                ScalarValue::Bytes(b) => {
                    out.extend_from_slice(b);
                    Ok(())
                }
                other => Err(CodecError::UnsupportedType(format!(
                    "cannot encode {other:?} through a passthrough codec"
                ))),
            },
        }
    }

    /// Fixed element width for preallocation, if any.
    pub fn binary_width(&self) -> Option<usize> {
        match self {
            ResolvedCodec::Scalar(kind) => kind.fixed_width(),
            ResolvedCodec::Extension(ext) => ext.binary_width(),
            _ => None,
        }
    }
}

/// Resolves type OIDs to codecs.
pub struct TypeCodecRegistry {
    type_info: Box<dyn TypeInfo>,
    extensions: HashMap<TypeOid, Arc<dyn ExtensionCodec>>,
}

impl TypeCodecRegistry {
    pub fn new(type_info: Box<dyn TypeInfo>) -> Self {
        TypeCodecRegistry {
            type_info,
            extensions: HashMap::new(),
        }
    }

    /// Registry over the built-in tables only.
    pub fn with_builtins() -> Self {
        Self::new(Box::new(EmptyTypeInfo))
    }

    /// Register a codec for an extension type. Must happen during the
    /// single-threaded initialization window, before the registry is
    /// shared.
    pub fn register_extension(&mut self, type_oid: TypeOid, codec: Arc<dyn ExtensionCodec>) {
        self.extensions.insert(type_oid, codec);
    }

    /// Resolve the codec for a type OID.
    pub fn resolve(&self, type_oid: TypeOid) -> Result<ResolvedCodec> {
        if let Some(kind) = ScalarKind::for_oid(type_oid) {
            return Ok(ResolvedCodec::Scalar(kind));
        }
        if let Some(ext) = self.extensions.get(&type_oid) {
            return Ok(ResolvedCodec::Extension(Arc::clone(ext)));
        }

        let name = self.type_info.type_name(type_oid).or_else(|| {
            let builtin = oid::oid_to_name(type_oid);
            (builtin != "unknown").then(|| builtin.to_owned())
        });
        let Some(name) = name else {
            return Err(CodecError::UnsupportedType(format!(
                "no type name resolvable for oid {type_oid}"
            )));
        };

        match self.type_info.type_category(&name) {
            Some(TypeCategory::Character) => Ok(ResolvedCodec::TextPassthrough),
            Some(TypeCategory::Composite) => {
                let descriptor = self.type_info.struct_descriptor(&name).ok_or_else(|| {
                    CodecError::UnsupportedType(format!(
                        "composite type {name:?} has no attribute descriptor"
                    ))
                })?;
                Ok(ResolvedCodec::Composite(descriptor))
            }
            _ => {
                debug!(oid = type_oid, name = %name, "no codec for type, using name-keyed fallback");
                Ok(ResolvedCodec::Named(name))
            }
        }
    }

    /// Element OID for a declared array OID: built-in table first, then
    /// the metadata cache.
    pub fn element_oid(&self, array_oid: TypeOid) -> Result<TypeOid> {
        oid::element_of(array_oid)
            .or_else(|| self.type_info.array_element_oid(array_oid))
            .ok_or_else(|| {
                CodecError::UnsupportedType(format!("no element type known for array oid {array_oid}"))
            })
    }

    /// Attribute descriptor for a composite type name.
    pub fn descriptor(&self, type_name: &str) -> Result<TypeDescriptor> {
        self.type_info.struct_descriptor(type_name).ok_or_else(|| {
            CodecError::UnsupportedType(format!(
                "composite type {type_name:?} has no attribute descriptor"
            ))
        })
    }
}

impl fmt::Debug for TypeCodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCodecRegistry")
            .field("extensions", &self.extensions.keys())
            .finish_non_exhaustive()
    }
}

// ==================== uuid extension codec ====================

/// Reference extension codec: PostgreSQL `uuid` (oid 2950).
#[cfg(feature = "uuid")]
#[derive(Debug, Default)]
pub struct UuidCodec;

#[cfg(feature = "uuid")]
impl ExtensionCodec for UuidCodec {
    fn decode_binary(&self, raw: &[u8]) -> Result<ScalarValue> {
        uuid::Uuid::from_slice(raw)
            .map(ScalarValue::Uuid)
            .map_err(|e| CodecError::MalformedWireData(format!("bad uuid payload: {e}")))
    }

    fn decode_text(&self, text: &str) -> Result<ScalarValue> {
        uuid::Uuid::parse_str(text)
            .map(ScalarValue::Uuid)
            .map_err(|e| CodecError::InvalidSyntax(format!("invalid uuid literal {text:?}: {e}")))
    }

    fn encode_binary(&self, value: &ScalarValue, out: &mut BytesMut) -> Result<()> {
        match value {
            ScalarValue::Uuid(u) => {
                out.extend_from_slice(u.as_bytes());
                Ok(())
            }
            other => Err(CodecError::UnsupportedType(format!(
                "cannot encode {other:?} as uuid"
            ))),
        }
    }

    fn encode_text(&self, value: &ScalarValue) -> Result<String> {
        match value {
            ScalarValue::Uuid(u) => Ok(u.to_string()),
            other => Err(CodecError::UnsupportedType(format!(
                "cannot encode {other:?} as uuid"
            ))),
        }
    }

    fn binary_width(&self) -> Option<usize> {
        Some(16)
    }
}
