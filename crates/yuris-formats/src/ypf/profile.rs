//! Version-dependent layout parameters
//!
//! Every field width, table and checksum choice that changes between
//! archive versions is resolved once into a [`FormatProfile`].

use super::checksum::{ChecksumFamily, ChecksumPurpose};
use super::obfuscation;

/// First version with 64-bit payload offsets and MurmurHash2 checksums
pub const OFFSET64_MIN_VERSION: u32 = 479;

/// First version using the newer name length permutation
pub const SWAP_TABLE_V500_MIN_VERSION: u32 = 500;

/// Width of the per-entry payload offset field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetWidth {
    /// 32-bit offsets (version < 479)
    U32,
    /// 64-bit offsets
    U64,
}

impl OffsetWidth {
    /// Encoded size in bytes
    pub const fn size(self) -> usize {
        match self {
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest offset the field can hold
    pub const fn max_offset(self) -> u64 {
        match self {
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }
}

/// Resolved layout parameters for one archive version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatProfile {
    /// Archive version from the header
    pub version: u32,
    /// Name/data checksum algorithms
    pub checksum: ChecksumFamily,
    /// Payload offset field width
    pub offset_width: OffsetWidth,
    /// Name length permutation
    pub swap_table: &'static [u8; 256],
    /// Name byte cipher key
    pub cipher_key: u8,
}

impl FormatProfile {
    /// Resolve the profile for an archive version
    pub fn for_version(version: u32) -> Self {
        Self {
            version,
            checksum: ChecksumFamily::for_version(version),
            offset_width: if version < OFFSET64_MIN_VERSION {
                OffsetWidth::U32
            } else {
                OffsetWidth::U64
            },
            swap_table: obfuscation::swap_table(version),
            cipher_key: obfuscation::cipher_key(version),
        }
    }

    /// Checksum over obfuscated name bytes
    pub fn name_checksum(&self, stored_name: &[u8]) -> u32 {
        self.checksum.compute(stored_name, ChecksumPurpose::Name)
    }

    /// Checksum over stored payload bytes
    pub fn data_checksum(&self, stored_payload: &[u8]) -> u32 {
        self.checksum.compute(stored_payload, ChecksumPurpose::Data)
    }

    /// Size of one directory record with a name of `name_len` bytes
    ///
    /// checksum(4) + length(1) + name + type(1) + compressed(1)
    /// + raw size(4) + stored size(4) + offset + data checksum(4)
    pub const fn entry_record_size(&self, name_len: usize) -> usize {
        19 + name_len + self.offset_width.size()
    }

    /// Largest archive this version can address
    pub const fn max_archive_size(&self) -> u64 {
        self.offset_width.max_offset()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ypf::obfuscation::{SWAP_TABLE_LEGACY, SWAP_TABLE_V500};

    #[test]
    fn test_legacy_290_profile() {
        let profile = FormatProfile::for_version(290);
        assert_eq!(profile.checksum, ChecksumFamily::Legacy);
        assert_eq!(profile.offset_width, OffsetWidth::U32);
        assert_eq!(profile.cipher_key, 64);
        assert_eq!(profile.swap_table, &SWAP_TABLE_LEGACY);
        assert_eq!(profile.entry_record_size(5), 28);
    }

    #[test]
    fn test_boundary_479_profile() {
        let profile = FormatProfile::for_version(479);
        assert_eq!(profile.checksum, ChecksumFamily::Murmur2);
        assert_eq!(profile.offset_width, OffsetWidth::U64);
        assert_eq!(profile.cipher_key, 0);
        assert_eq!(profile.swap_table, &SWAP_TABLE_LEGACY);
        assert_eq!(profile.entry_record_size(5), 32);
    }

    #[test]
    fn test_v500_and_later_profiles() {
        let v500 = FormatProfile::for_version(500);
        assert_eq!(v500.swap_table, &SWAP_TABLE_V500);
        assert_eq!(v500.cipher_key, 0);

        let v501 = FormatProfile::for_version(501);
        assert_eq!(v501.swap_table, &SWAP_TABLE_V500);
        assert_eq!(v501.cipher_key, 54);
    }

    #[test]
    fn test_max_archive_size() {
        assert_eq!(
            FormatProfile::for_version(300).max_archive_size(),
            u64::from(u32::MAX)
        );
        assert_eq!(FormatProfile::for_version(479).max_archive_size(), u64::MAX);
    }
}
