//! Sequential big-endian reader for binary manifest data
//!
//! [`ByteReader`] walks an in-memory buffer with a single forward cursor and
//! decodes the primitive types used by the asset manifest and table formats:
//! fixed-width big-endian integers, length-prefixed UTF-8 strings and the
//! rearranged zig-zag varint described in [`varint`].
//!
//! Every read either succeeds and advances the cursor by exactly the bytes it
//! consumed, or fails and leaves the cursor untouched.
//!
//! ```rust
//! use assetsync::reader::ByteReader;
//!
//! let mut reader = ByteReader::new(&[0x00, 0x00, 0x00, 0x05, 0x40]);
//! assert_eq!(reader.read_u32().unwrap(), 5);
//! assert_eq!(reader.read_var_int().unwrap(), -1);
//! assert!(reader.is_empty());
//! ```

pub mod error;
pub mod varint;

pub use error::{ReadError, Result};
pub use varint::{encode_var_int, zigzag_decode, zigzag_encode};

use varint::unscramble_first_byte;

/// Length prefix value that marks an absent string.
const NULL_STRING_LENGTH: u32 = u32::MAX;

/// Forward-only reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($(#[$doc:meta] $name:ident -> $ty:ty;)*) => {
        $(
            #[$doc]
            pub fn $name(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_be_bytes(self.take_array()?))
            }
        )*
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current cursor offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes after the cursor, without consuming them
    pub fn rest(&self) -> &'a [u8] {
        let buf = self.buf;
        &buf[self.pos..]
    }

    /// Consume exactly `len` bytes
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(ReadError::OutOfData {
                offset: self.pos,
                needed: len,
                available: self.remaining(),
            });
        }
        let buf = self.buf;
        let bytes = &buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    read_be! {
        /// Read an unsigned 8-bit integer
        read_u8 -> u8;
        /// Read a signed 8-bit integer
        read_i8 -> i8;
        /// Read a big-endian unsigned 16-bit integer
        read_u16 -> u16;
        /// Read a big-endian signed 16-bit integer
        read_i16 -> i16;
        /// Read a big-endian unsigned 32-bit integer
        read_u32 -> u32;
        /// Read a big-endian signed 32-bit integer
        read_i32 -> i32;
        /// Read a big-endian unsigned 64-bit integer
        read_u64 -> u64;
        /// Read a big-endian signed 64-bit integer
        read_i64 -> i64;
    }

    /// Read `len` bytes and decode them as UTF-8
    pub fn read_str(&mut self, len: usize) -> Result<&'a str> {
        let start = self.pos;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|source| {
            self.pos = start;
            ReadError::InvalidEncoding {
                offset: start,
                length: len,
                source,
            }
        })
    }

    /// Read a string prefixed by its 4-byte big-endian length.
    ///
    /// A length of `0` or `0xFFFF_FFFF` denotes an empty string and nothing
    /// past the prefix is consumed.
    pub fn read_string(&mut self) -> Result<String> {
        let start = self.pos;
        let len = self.read_u32()?;
        if len == 0 || len == NULL_STRING_LENGTH {
            return Ok(String::new());
        }
        match self.read_str(len as usize) {
            Ok(s) => Ok(s.to_owned()),
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    /// Read a zig-zag varint whose first byte uses the rearranged layout
    pub fn read_var_int(&mut self) -> Result<i64> {
        let start = self.pos;
        let mut raw: u64 = 0;
        let mut shift: u32 = 0;

        loop {
            let Some(&wire) = self.buf.get(self.pos) else {
                let consumed = self.pos - start;
                self.pos = start;
                return Err(ReadError::OutOfData {
                    offset: start,
                    needed: consumed + 1,
                    available: consumed,
                });
            };
            self.pos += 1;

            let byte = if shift == 0 {
                unscramble_first_byte(wire)
            } else {
                wire
            };
            let payload = u64::from(byte & 0x7f);
            if shift >= 64 || (shift == 63 && payload > 1) {
                self.pos = start;
                return Err(ReadError::VarIntOverflow { offset: start });
            }
            raw |= payload << shift;

            if byte & 0x80 == 0 {
                break;
            }
            shift += 7;
        }

        Ok(zigzag_decode(raw))
    }
}
