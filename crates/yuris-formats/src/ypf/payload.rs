//! Member payload compression
//!
//! Payloads are zlib streams when that makes them strictly smaller, and
//! raw bytes otherwise.

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use std::io::{Read, Write};
use thiserror::Error;

// Cap on up-front allocation when inflating; the stream may still grow past it.
const MAX_PREALLOCATION: usize = 64 * 1024 * 1024;

/// Payload compression errors
#[derive(Debug, Error)]
pub enum PayloadError {
    /// zlib stream could not be produced
    #[error("deflate failed: {0}")]
    Deflate(#[source] std::io::Error),

    /// zlib stream is corrupt
    #[error("inflate failed: {0}")]
    Inflate(#[source] std::io::Error),

    /// Stream inflated to a different size than recorded
    #[error("inflated to {actual} bytes, expected {expected}")]
    SizeMismatch {
        /// Recorded raw size
        expected: u64,
        /// Bytes produced (capped at `expected + 1`)
        actual: u64,
    },
}

/// Payload bytes as they are written to the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    /// Stored bytes
    pub bytes: Vec<u8>,
    /// Whether `bytes` is a zlib stream
    pub is_compressed: bool,
}

/// Compress `raw`, keeping the result only if it is strictly smaller
pub fn store(raw: &[u8]) -> Result<StoredPayload, PayloadError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(raw.len() / 2), Compression::default());
    encoder.write_all(raw).map_err(PayloadError::Deflate)?;
    let compressed = encoder.finish().map_err(PayloadError::Deflate)?;

    if compressed.len() < raw.len() {
        Ok(StoredPayload {
            bytes: compressed,
            is_compressed: true,
        })
    } else {
        Ok(StoredPayload {
            bytes: raw.to_vec(),
            is_compressed: false,
        })
    }
}

/// Recover raw bytes from a stored payload
///
/// Compressed payloads must inflate to exactly `raw_size` bytes. Raw
/// payloads are returned as stored.
pub fn load(stored: &[u8], is_compressed: bool, raw_size: u32) -> Result<Vec<u8>, PayloadError> {
    if !is_compressed {
        return Ok(stored.to_vec());
    }

    let expected = u64::from(raw_size);
    let capacity = usize::try_from(expected)
        .unwrap_or(MAX_PREALLOCATION)
        .min(MAX_PREALLOCATION);
    let mut raw = Vec::with_capacity(capacity);

    // Read one byte past the recorded size so overlong streams are caught.
    ZlibDecoder::new(stored)
        .take(expected + 1)
        .read_to_end(&mut raw)
        .map_err(PayloadError::Inflate)?;

    if raw.len() as u64 != expected {
        return Err(PayloadError::SizeMismatch {
            expected,
            actual: raw.len() as u64,
        });
    }

    Ok(raw)
}
