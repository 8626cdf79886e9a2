//! Array codecs: binary wire format and text literal grammar.
//!
//! Both directions share the [`crate::value::ArrayValue`] model and the
//! shape arithmetic in [`crate::walker`]. Binary decode trusts the
//! element OID embedded in the wire header; text decode resolves the
//! element type from the declared array OID, since the literal carries
//! no type information of its own.

pub mod binary;
pub mod text;
