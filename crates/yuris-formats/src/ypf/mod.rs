//! YPF archive format implementation
//!
//! YPF is the resource archive of the YU-RIS engine. An archive is a 32-byte
//! header, a directory of variable-length records, then the member payloads.
//! Every version-dependent choice (checksums, offset width, name obfuscation)
//! is resolved once from the header version into a [`FormatProfile`].
//!
//! # Features
//!
//! - Parser and builder for versions with 32-bit and 64-bit offsets
//! - Legacy CRC-32/Adler-32 and MurmurHash2 checksums
//! - Name length permutation and name byte cipher
//! - zlib payloads with raw fallback
//! - Payload deduplication when packing
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use yuris_formats::codepage::Codepage;
//! use yuris_formats::ypf::{self, PackOptions};
//!
//! let data = ypf::pack_with_options(Path::new("data"), PackOptions::default())?;
//! let info = ypf::parse(&data, Codepage::default())?;
//! ypf::extract_all(&data, &info.entries, Path::new("out"))?;
//! # Ok::<(), yuris_formats::ypf::YpfError>(())
//! ```

mod archive;
mod builder;
pub mod checksum;
pub mod directory;
mod error;
mod file_kind;
pub mod obfuscation;
pub mod payload;
pub mod profile;

pub use archive::{
    ArchiveInfo, VerifyReport, YpfArchive, entry_path, extract_all, extract_one, parse, verify,
    write_file_atomic,
};
pub use builder::{
    DEFAULT_SEPARATOR, DEFAULT_VERSION, PackOptions, PackedArchive, YpfBuilder, collect_files,
    pack, pack_to_file, pack_with_options,
};
pub use checksum::{ChecksumFamily, ChecksumPurpose};
pub use directory::{ArchiveEntry, ArchiveHeader, HEADER_SIZE, YPF_MAGIC};
pub use error::{YpfError, YpfResult};
pub use file_kind::FileKind;
pub use obfuscation::{MAX_NAME_LENGTH, ObfuscatedName};
pub use payload::PayloadError;
pub use profile::{FormatProfile, OFFSET64_MIN_VERSION, OffsetWidth, SWAP_TABLE_V500_MIN_VERSION};
