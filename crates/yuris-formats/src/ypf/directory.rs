//! YPF header and directory records
//!
//! ```text
//! Header (32 bytes):
//!   magic[4] = "YPF\0", version:u32, entry_count:u32, directory_size:u32, reserved[16]
//! Entry:
//!   name_checksum:u32, length_byte:u8, name[len], type:u8, compressed:u8,
//!   raw_size:u32, stored_size:u32, offset:u32|u64, data_checksum:u32
//! ```
//!
//! All integers are little-endian. `directory_size` covers the header and
//! every entry record, so the first payload starts right after it.

use binrw::{BinRead, BinWrite, BinWriterExt, Endian};
use std::io::{Cursor, Read, Seek, Write};
use tracing::debug;

use crate::codepage::Codepage;

use super::error::{YpfError, YpfResult};
use super::file_kind::FileKind;
use super::obfuscation::{self, ObfuscatedName};
use super::profile::{FormatProfile, OffsetWidth};

/// YPF magic bytes
pub const YPF_MAGIC: [u8; 4] = *b"YPF\0";

/// Size of the fixed archive header
pub const HEADER_SIZE: usize = 32;

/// Fixed archive header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct ArchiveHeader {
    /// Magic bytes (always "YPF\0")
    pub magic: [u8; 4],
    /// Archive version; selects every version-dependent behaviour
    pub version: u32,
    /// Number of directory records
    pub entry_count: u32,
    /// Bytes covered by the header plus all directory records
    pub directory_size: u32,
    /// Unknown field, zero in observed archives and kept verbatim
    pub reserved: [u8; 16],
}

impl ArchiveHeader {
    /// Create a header for a fresh archive
    pub fn new(version: u32, entry_count: u32, directory_size: u32) -> Self {
        Self {
            magic: YPF_MAGIC,
            version,
            entry_count,
            directory_size,
            reserved: [0; 16],
        }
    }

    /// Read and validate a header
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> YpfResult<Self> {
        let header = Self::read(reader).map_err(|e| YpfError::from_read(e, "archive header"))?;
        header.validate()?;
        Ok(header)
    }

    /// Parse and validate the header at the start of `data`
    pub fn parse(data: &[u8]) -> YpfResult<Self> {
        Self::read_from(&mut Cursor::new(data))
    }

    /// Check the magic bytes
    pub fn validate(&self) -> YpfResult<()> {
        if self.magic != YPF_MAGIC {
            return Err(YpfError::BadMagic(self.magic));
        }
        Ok(())
    }

    /// Layout parameters for this header's version
    pub fn profile(&self) -> FormatProfile {
        FormatProfile::for_version(self.version)
    }
}

/// One directory record with its name decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Checksum of the stored (obfuscated) name bytes
    pub name_checksum: u32,
    /// Decoded name, using the archive's separators
    pub name: String,
    /// File kind tag; see [`FileKind`]
    pub file_type: u8,
    /// Whether the payload is a zlib stream
    pub is_compressed: bool,
    /// Size after decompression
    pub raw_size: u32,
    /// Size of the stored payload
    pub compressed_size: u32,
    /// Payload position from the start of the archive
    pub offset: u64,
    /// Checksum of the stored payload bytes
    pub data_checksum: u32,
}

impl ArchiveEntry {
    /// File kind, if the tag is a known one
    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_tag(self.file_type)
    }

    /// End of the stored payload, exclusive
    pub fn payload_end(&self) -> u64 {
        self.offset.saturating_add(u64::from(self.compressed_size))
    }
}

fn read_field<T, R>(reader: &mut R, context: &str) -> YpfResult<T>
where
    T: for<'a> BinRead<Args<'a> = ()>,
    R: Read + Seek,
{
    T::read_options(reader, Endian::Little, ()).map_err(|e| YpfError::from_read(e, context))
}

/// Read one directory record
///
/// The name checksum is verified against the stored name bytes before the
/// name is deciphered; a mismatch means the directory is corrupt.
pub fn read_entry<R: Read + Seek>(
    reader: &mut R,
    profile: &FormatProfile,
    codepage: Codepage,
) -> YpfResult<ArchiveEntry> {
    let name_checksum: u32 = read_field(reader, "directory entry")?;
    let length_byte: u8 = read_field(reader, "directory entry")?;

    let name_len = obfuscation::decode_name_length(length_byte, profile.swap_table);
    let mut stored_name = vec![0u8; name_len];
    reader
        .read_exact(&mut stored_name)
        .map_err(|e| YpfError::from_io_read(e, "entry name"))?;

    let stored = ObfuscatedName {
        length_byte,
        bytes: stored_name,
    };
    let name = stored.decode(profile, codepage);

    let actual = stored.checksum(profile);
    if actual != name_checksum {
        return Err(YpfError::NameChecksumMismatch {
            name,
            expected: name_checksum,
            actual,
        });
    }

    let context = format!("directory entry {name}");
    let file_type: u8 = read_field(reader, &context)?;
    let compressed_flag: u8 = read_field(reader, &context)?;
    let raw_size: u32 = read_field(reader, &context)?;
    let compressed_size: u32 = read_field(reader, &context)?;
    let offset = match profile.offset_width {
        OffsetWidth::U32 => u64::from(read_field::<u32, _>(reader, &context)?),
        OffsetWidth::U64 => read_field::<u64, _>(reader, &context)?,
    };
    let data_checksum: u32 = read_field(reader, &context)?;

    Ok(ArchiveEntry {
        name_checksum,
        name,
        file_type,
        is_compressed: compressed_flag == 1,
        raw_size,
        compressed_size,
        offset,
        data_checksum,
    })
}

/// Write one directory record
pub fn write_entry<W: Write + Seek>(
    writer: &mut W,
    entry: &ArchiveEntry,
    stored_name: &ObfuscatedName,
    profile: &FormatProfile,
) -> YpfResult<()> {
    writer.write_le(&entry.name_checksum)?;
    writer.write_le(&stored_name.length_byte)?;
    writer.write_all(&stored_name.bytes)?;
    writer.write_le(&entry.file_type)?;
    writer.write_le(&u8::from(entry.is_compressed))?;
    writer.write_le(&entry.raw_size)?;
    writer.write_le(&entry.compressed_size)?;
    match profile.offset_width {
        OffsetWidth::U32 => {
            let offset = u32::try_from(entry.offset).map_err(|_| YpfError::OutputSizeExceeded {
                size: entry.offset,
                limit: profile.max_archive_size(),
                version: profile.version,
            })?;
            writer.write_le(&offset)?;
        }
        OffsetWidth::U64 => writer.write_le(&entry.offset)?,
    }
    writer.write_le(&entry.data_checksum)?;
    Ok(())
}

/// Read the header and every directory record, in directory order
pub fn read_directory(
    data: &[u8],
    codepage: Codepage,
) -> YpfResult<(ArchiveHeader, Vec<ArchiveEntry>)> {
    let mut cursor = Cursor::new(data);
    let header = ArchiveHeader::read_from(&mut cursor)?;
    let profile = header.profile();

    // Each record is at least 19 bytes; don't trust the count for allocation.
    let capacity = (header.entry_count as usize).min(data.len() / 19);
    let mut entries = Vec::with_capacity(capacity);

    for _ in 0..header.entry_count {
        let entry = read_entry(&mut cursor, &profile, codepage)?;
        debug!(
            "Read entry {} at offset {} ({} bytes stored)",
            entry.name, entry.offset, entry.compressed_size
        );
        entries.push(entry);
    }

    Ok((header, entries))
}

/// Serialize the header and directory records
///
/// `entries` pairs each record with its stored name and must already be in
/// directory order. The output length must equal `header.directory_size`.
pub fn write_directory(
    header: &ArchiveHeader,
    entries: &[(ArchiveEntry, ObfuscatedName)],
) -> YpfResult<Vec<u8>> {
    let profile = header.profile();
    let mut cursor = Cursor::new(Vec::with_capacity(header.directory_size as usize));

    header.write(&mut cursor)?;
    for (entry, stored_name) in entries {
        write_entry(&mut cursor, entry, stored_name, &profile)?;
    }

    let directory = cursor.into_inner();
    if directory.len() as u64 != u64::from(header.directory_size) {
        return Err(YpfError::DirectorySizeMismatch {
            declared: u64::from(header.directory_size),
            actual: directory.len() as u64,
        });
    }

    Ok(directory)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_entry(name: &str, profile: &FormatProfile) -> (ArchiveEntry, ObfuscatedName) {
        let stored = ObfuscatedName::encode(name, profile, Codepage::default()).unwrap();
        let entry = ArchiveEntry {
            name_checksum: stored.checksum(profile),
            name: name.to_string(),
            file_type: FileKind::for_name(name).tag(),
            is_compressed: false,
            raw_size: 2,
            compressed_size: 2,
            offset: 0x40,
            data_checksum: profile.data_checksum(b"hi"),
        };
        (entry, stored)
    }

    fn directory_bytes(version: u32, names: &[&str]) -> Vec<u8> {
        let profile = FormatProfile::for_version(version);
        let records: Vec<_> = names.iter().map(|n| sample_entry(n, &profile)).collect();
        let size = HEADER_SIZE
            + records
                .iter()
                .map(|(_, s)| profile.entry_record_size(s.bytes.len()))
                .sum::<usize>();
        let header = ArchiveHeader::new(version, records.len() as u32, size as u32);
        write_directory(&header, &records).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let header = ArchiveHeader::new(500, 3, 0x80);
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"YPF\0");
        assert_eq!(&bytes[4..8], &500u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &0x80u32.to_le_bytes());
        assert_eq!(&bytes[16..32], &[0u8; 16]);

        assert_eq!(ArchiveHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_reserved_bytes_preserved() {
        let mut header = ArchiveHeader::new(479, 0, 32);
        header.reserved = [0xAB; 16];
        let bytes = write_directory(&header, &[]).unwrap();
        assert_eq!(ArchiveHeader::parse(&bytes).unwrap().reserved, [0xAB; 16]);
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = directory_bytes(500, &[]);
        bytes[0..4].copy_from_slice(b"PACK");
        assert!(matches!(
            ArchiveHeader::parse(&bytes),
            Err(YpfError::BadMagic(m)) if &m == b"PACK"
        ));
    }

    #[test]
    fn test_short_header_is_truncated() {
        assert!(matches!(
            ArchiveHeader::parse(b"YPF\0\x01\x02"),
            Err(YpfError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_entry_round_trip_both_widths() {
        for version in [290, 478, 479, 500, 501] {
            let bytes = directory_bytes(version, &["a.txt", "bg\\title.png"]);
            let (header, entries) = read_directory(&bytes, Codepage::default()).unwrap();

            assert_eq!(header.version, version);
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].name, "a.txt");
            assert_eq!(entries[1].name, "bg\\title.png");
            assert_eq!(entries[1].kind(), Some(FileKind::Png));
            assert_eq!(entries[0].offset, 0x40);
            assert!(!entries[0].is_compressed);
        }
    }

    #[test]
    fn test_record_sizes_on_disk() {
        // 32 header + (19 + 5 + 4) for a 32-bit offset record.
        assert_eq!(directory_bytes(290, &["a.txt"]).len(), 60);
        // 64-bit offsets add four bytes.
        assert_eq!(directory_bytes(500, &["a.txt"]).len(), 64);
    }

    #[test]
    fn test_stored_name_layout() {
        let bytes = directory_bytes(290, &["a.txt"]);
        let record = &bytes[HEADER_SIZE..];
        let stored: Vec<u8> = b"a.txt".iter().map(|b| !(b ^ 64)).collect();

        assert_eq!(record[4], !5u8);
        assert_eq!(&record[5..10], stored.as_slice());
        assert_eq!(
            u32::from_le_bytes(record[0..4].try_into().unwrap()),
            FormatProfile::for_version(290).name_checksum(&stored)
        );
    }

    #[test]
    fn test_name_checksum_mismatch_detected() {
        let mut bytes = directory_bytes(500, &["a.txt"]);
        bytes[HEADER_SIZE + 5] ^= 0x01;
        let err = read_directory(&bytes, Codepage::default()).unwrap_err();
        assert!(matches!(err, YpfError::NameChecksumMismatch { .. }));
    }

    #[test]
    fn test_truncated_directory() {
        let bytes = directory_bytes(500, &["a.txt"]);
        let err = read_directory(&bytes[..bytes.len() - 3], Codepage::default()).unwrap_err();
        assert!(matches!(err, YpfError::TruncatedInput { .. }));
    }

    #[test]
    fn test_declared_size_mismatch() {
        let profile = FormatProfile::for_version(500);
        let records = vec![sample_entry("a.txt", &profile)];
        let header = ArchiveHeader::new(500, 1, 40);
        assert!(matches!(
            write_directory(&header, &records),
            Err(YpfError::DirectorySizeMismatch {
                declared: 40,
                actual: 64
            })
        ));
    }

    #[test]
    fn test_wide_offset_rejected_for_legacy_version() {
        let profile = FormatProfile::for_version(290);
        let (mut entry, stored) = sample_entry("a.txt", &profile);
        entry.offset = u64::from(u32::MAX) + 1;
        let mut cursor = Cursor::new(Vec::new());
        assert!(matches!(
            write_entry(&mut cursor, &entry, &stored, &profile),
            Err(YpfError::OutputSizeExceeded { .. })
        ));
    }
}
