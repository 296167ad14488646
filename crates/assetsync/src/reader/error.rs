//! Errors raised while decoding binary manifest data

use thiserror::Error;

/// Failure of a single decode call on a [`ByteReader`](super::ByteReader)
///
/// A decode error stops only the read that raised it; the reader's cursor is
/// left where that read started.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Fewer bytes remain than the read requires
    #[error("unexpected end of data at offset {offset}: needed {needed} bytes, {available} available")]
    OutOfData {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A string payload is not valid UTF-8
    #[error("invalid UTF-8 in {length}-byte string at offset {offset}")]
    InvalidEncoding {
        offset: usize,
        length: usize,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A variable-length integer does not fit in 64 bits
    #[error("variable-length integer at offset {offset} overflows 64 bits")]
    VarIntOverflow { offset: usize },
}

pub type Result<T> = std::result::Result<T, ReadError>;
