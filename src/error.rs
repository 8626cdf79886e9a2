//! Codec errors.
//!
//! Every failure in this crate is a deterministic function of the input
//! bytes or text, so errors are synchronous and never retried. No partial
//! value is ever returned alongside an error.

use thiserror::Error;

/// Errors produced while transcoding structured types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Binary payload is truncated, declares inconsistent lengths or
    /// dimensions, or a composite column count does not match its
    /// descriptor.
    #[error("malformed wire data: {0}")]
    MalformedWireData(String),

    /// No codec is resolvable for the OID and no fallback applies.
    #[error("unsupported type: {0}")]
    UnsupportedType(String),

    /// Character-set conversion failed. Always fatal, never retryable.
    #[error("character encoding failure: {0}")]
    EncodingFailure(String),

    /// Text-grammar violation: unterminated quote, trailing junk, wrong
    /// bracket or parenthesis nesting.
    #[error("invalid text representation: {0}")]
    InvalidSyntax(String),
}

pub type Result<T> = std::result::Result<T, CodecError>;
