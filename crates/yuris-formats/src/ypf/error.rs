//! Error types for YPF archive operations

use std::path::PathBuf;
use thiserror::Error;

use super::payload::PayloadError;

/// YPF operation result type
pub type YpfResult<T> = Result<T, YpfError>;

/// Errors raised while parsing, extracting or building YPF archives
#[derive(Debug, Error)]
pub enum YpfError {
    /// Archive does not start with `YPF\0`
    #[error("invalid YPF magic: expected [59 50 46 00], got {0:02X?}")]
    BadMagic([u8; 4]),

    /// Input ended before a structure or payload was complete
    #[error("truncated input while reading {context}")]
    TruncatedInput {
        /// What was being read when the input ran out
        context: String,
    },

    /// Stored name checksum does not match the obfuscated name bytes
    #[error("name checksum mismatch for {name}: stored {expected:08x}, computed {actual:08x}")]
    NameChecksumMismatch {
        /// Decoded entry name
        name: String,
        /// Checksum recorded in the directory
        expected: u32,
        /// Checksum computed over the stored name bytes
        actual: u32,
    },

    /// Stored payload checksum does not match the payload bytes
    ///
    /// Extraction reports this and carries on; it only surfaces as an error
    /// value from verification.
    #[error("data checksum mismatch for {name}: stored {expected:08x}, computed {actual:08x}")]
    DataChecksumMismatch {
        /// Entry name
        name: String,
        /// Checksum recorded in the directory
        expected: u32,
        /// Checksum computed over the stored payload
        actual: u32,
    },

    /// Compressed payload could not be inflated to its recorded size
    #[error("failed to decompress {name}: {source}")]
    DecompressionFailure {
        /// Entry name
        name: String,
        /// Underlying payload error
        #[source]
        source: PayloadError,
    },

    /// Payload could not be deflated while packing
    #[error("failed to compress {name}: {source}")]
    CompressionFailure {
        /// Entry name
        name: String,
        /// Underlying payload error
        #[source]
        source: PayloadError,
    },

    /// Two source files map to the same archive name
    #[error("duplicate file name: {0}")]
    DuplicateFilename(String),

    /// Source file maps to an empty archive name
    #[error("empty file name for {}", .0.display())]
    EmptyFilename(PathBuf),

    /// Encoded name does not fit the one-byte length field
    #[error("file name too long: {name} encodes to {length} bytes (max 255)")]
    FilenameTooLong {
        /// Entry name
        name: String,
        /// Encoded length in bytes
        length: usize,
    },

    /// No length-swap table slot produces the given name length
    #[error("name length {0} has no encoding in the length table")]
    UnencodableNameLength(usize),

    /// Source file is larger than the 32-bit size field allows
    #[error("file too large: {} is {size} bytes (max 4294967295)", path.display())]
    FileTooLarge {
        /// Source path
        path: PathBuf,
        /// File size in bytes
        size: u64,
    },

    /// Source file has no content
    #[error("empty file: {}", .0.display())]
    EmptyFile(PathBuf),

    /// Packed archive exceeds what the version's offset fields can address
    #[error("archive size {size} exceeds the {limit}-byte limit of version {version}")]
    OutputSizeExceeded {
        /// Size that would have been produced
        size: u64,
        /// Largest addressable size
        limit: u64,
        /// Archive version
        version: u32,
    },

    /// Serialized directory does not match the declared directory size
    #[error("directory size mismatch: declared {declared}, serialized {actual}")]
    DirectorySizeMismatch {
        /// Size recorded in the header
        declared: u64,
        /// Bytes actually produced
        actual: u64,
    },

    /// Entry name would escape the extraction root
    #[error("unsafe entry path: {0}")]
    UnsafePath(String),

    /// Code page number is not supported
    #[error("unsupported code page: {0}")]
    UnsupportedCodepage(u32),

    /// Binary read/write error
    #[error("binary format error: {0}")]
    BinRw(#[from] binrw::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl YpfError {
    /// Whether this error aborts the operation that raised it
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::DataChecksumMismatch { .. })
    }

    /// Whether this error comes from a checksum comparison
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            Self::NameChecksumMismatch { .. } | Self::DataChecksumMismatch { .. }
        )
    }

    /// Whether this error is a pack-time input validation failure
    pub fn is_pack_input_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateFilename(_)
                | Self::EmptyFilename(_)
                | Self::FilenameTooLong { .. }
                | Self::UnencodableNameLength(_)
                | Self::FileTooLarge { .. }
                | Self::EmptyFile(_)
        )
    }

    /// Map a binrw read failure, turning end-of-input into [`YpfError::TruncatedInput`]
    pub(crate) fn from_read(err: binrw::Error, context: impl Into<String>) -> Self {
        if err.is_eof() {
            Self::TruncatedInput {
                context: context.into(),
            }
        } else {
            Self::BinRw(err)
        }
    }

    /// Map an I/O read failure, turning end-of-input into [`YpfError::TruncatedInput`]
    pub(crate) fn from_io_read(err: std::io::Error, context: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::TruncatedInput {
                context: context.into(),
            }
        } else {
            Self::Io(err)
        }
    }
}
