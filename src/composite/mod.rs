//! Composite (record) codecs: binary wire format and text literal
//! grammar.
//!
//! Both directions require a [`crate::value::TypeDescriptor`] resolved
//! through the registry's metadata cache; the descriptor's attribute
//! list drives field order, count and types.

pub mod binary;
pub mod text;
