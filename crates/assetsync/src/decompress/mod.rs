//! Post-download decompression of packed asset tables
//!
//! Tables on the asset store are served packed, optionally inside an `SC`
//! container. [`ScDecompressor`] strips the container and decodes the
//! payload; any other [`Decompressor`] (including a plain closure) can be
//! plugged into the orchestrator instead.

use std::io::Read;

use thiserror::Error;

use crate::reader::{ByteReader, ReadError};

const SC_MAGIC: &[u8] = b"SC";
const SCLZ_MAGIC: &[u8] = b"SCLZ";
const ZSTD_MAGIC: &[u8] = &[0x28, 0xB5, 0x2F, 0xFD];
const METADATA_MARKER: &[u8] = b"START";

/// Offset of the 4-byte uncompressed size that ends a packed LZMA header
const LZMA_SIZE_OFFSET: usize = 5;
const LZMA_PACKED_HEADER_LEN: usize = 9;

/// Errors raised while decompressing a payload
#[derive(Error, Debug)]
pub enum DecompressError {
    #[error("Malformed SC header: {0}")]
    Header(#[from] ReadError),

    #[error("Unsupported compression: {codec}")]
    Unsupported { codec: String },

    #[error("zstd decoding failed: {0}")]
    Zstd(#[source] std::io::Error),

    #[error("LZMA decoding failed: {0}")]
    Lzma(#[source] std::io::Error),

    #[error("{message}")]
    Invalid { message: String },
}

impl DecompressError {
    pub fn invalid<M: Into<String>>(message: M) -> Self {
        DecompressError::Invalid {
            message: message.into(),
        }
    }
}

/// Turns a downloaded payload into its decoded form
pub trait Decompressor: Send + Sync {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError>;
}

impl<F> Decompressor for F
where
    F: Fn(&[u8]) -> Result<Vec<u8>, DecompressError> + Send + Sync,
{
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        self(data)
    }
}

/// Decoder for Supercell-style packed tables
///
/// Accepts an optional `SC` container (versions 1 to 4, version 4 with a
/// trailing `START` metadata block) around either a zstd frame or an LZMA
/// stream whose uncompressed size field is 4 bytes wide instead of 8.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScDecompressor;

impl ScDecompressor {
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for ScDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, DecompressError> {
        let payload = strip_sc_container(data)?;

        if payload.starts_with(SCLZ_MAGIC) {
            return Err(DecompressError::Unsupported {
                codec: "SCLZ (LZHAM)".to_string(),
            });
        }

        if payload.starts_with(ZSTD_MAGIC) {
            return zstd::stream::decode_all(payload).map_err(DecompressError::Zstd);
        }

        decode_packed_lzma(payload)
    }
}

/// Return the compressed payload inside an `SC` container, or `data` itself
/// when it carries no container
fn strip_sc_container(data: &[u8]) -> Result<&[u8], DecompressError> {
    if !data.starts_with(SC_MAGIC) || data.starts_with(SCLZ_MAGIC) {
        return Ok(data);
    }

    let mut reader = ByteReader::new(data);
    reader.read_bytes(SC_MAGIC.len())?;
    let mut version = reader.read_u32()?;
    let has_metadata = version == 4;
    if has_metadata {
        version = reader.read_u32()?;
    }
    let hash_length = reader.read_u32()? as usize;
    reader.read_bytes(hash_length)?;
    tracing::trace!(version, hash_length, "stripped SC container header");

    let mut payload = reader.rest();
    if has_metadata {
        if let Some(index) = rfind(payload, METADATA_MARKER) {
            payload = &payload[..index];
        }
    }
    Ok(payload)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .rposition(|window| window == needle)
}

/// Widen the 4-byte size field to the 8 bytes liblzma expects and decode
fn decode_packed_lzma(payload: &[u8]) -> Result<Vec<u8>, DecompressError> {
    if payload.len() < LZMA_PACKED_HEADER_LEN {
        return Err(DecompressError::invalid(format!(
            "payload of {} bytes is too short for an LZMA header",
            payload.len()
        )));
    }

    let size_field = &payload[LZMA_SIZE_OFFSET..LZMA_PACKED_HEADER_LEN];
    let padding = if size_field == [0xFF; 4] { 0xFF } else { 0x00 };

    let mut widened = Vec::with_capacity(payload.len() + 4);
    widened.extend_from_slice(&payload[..LZMA_PACKED_HEADER_LEN]);
    widened.extend_from_slice(&[padding; 4]);
    widened.extend_from_slice(&payload[LZMA_PACKED_HEADER_LEN..]);

    let stream = xz2::stream::Stream::new_lzma_decoder(u64::MAX)
        .map_err(|e| DecompressError::Lzma(std::io::Error::other(e)))?;
    let mut decoder = xz2::read::XzDecoder::new_stream(widened.as_slice(), stream);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(DecompressError::Lzma)?;
    Ok(output)
}
