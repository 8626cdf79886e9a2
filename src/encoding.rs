//! Character-set conversion between wire bytes and Rust strings.
//!
//! The connection owns its encoding configuration; codecs borrow it for
//! the duration of a call. Conversion failures are always fatal: they
//! indicate stored data that is invalid for the database encoding.

use std::borrow::Cow;

use crate::error::{CodecError, Result};

/// Client-side character encoding.
///
/// UTF-8 is the only encoding PostgreSQL clients should negotiate; the
/// type exists so the scalar codec never assumes it implicitly.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientEncoding {
    _priv: (),
}

impl ClientEncoding {
    pub fn utf8() -> Self {
        ClientEncoding { _priv: () }
    }

    /// Decode wire bytes into text.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Result<&'a str> {
        std::str::from_utf8(bytes).map_err(|e| {
            CodecError::EncodingFailure(format!("invalid byte sequence for encoding UTF8: {e}"))
        })
    }

    /// Encode text into wire bytes.
    pub fn encode<'a>(&self, text: &'a str) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(text.as_bytes()))
    }
}
