//! File name obfuscation
//!
//! Directory names are stored behind two light layers:
//!
//! - the one-byte length is complemented and passed through a fixed
//!   permutation of `0..=255`;
//! - each name byte is XORed with a version key and complemented.
//!
//! Both layers are their own inverse, so the same functions serve reading
//! and writing. Name checksums cover the bytes as stored, after both layers.

use crate::codepage::Codepage;

use super::error::{YpfError, YpfResult};
use super::profile::{FormatProfile, SWAP_TABLE_V500_MIN_VERSION};

/// Longest name the one-byte length field can describe
pub const MAX_NAME_LENGTH: usize = 255;

/// Name length permutation for archives at version 500 and later.
pub const SWAP_TABLE_V500: [u8; 256] = [
    0, 1, 2, 10, 4, 5, 53, 7, 8, 11, 3, 9, 16, 19, 14, 15,
    12, 24, 18, 13, 46, 27, 22, 23, 17, 25, 26, 21, 30, 29, 28, 31,
    35, 33, 34, 32, 36, 37, 41, 39, 40, 38, 42, 43, 47, 45, 20, 44,
    48, 49, 50, 51, 52, 6, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63,
    64, 65, 66, 67, 68, 69, 70, 71, 72, 73, 74, 75, 76, 77, 78, 79,
    80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92, 93, 94, 95,
    96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111,
    112, 113, 114, 115, 116, 117, 118, 119, 120, 121, 122, 123, 124, 125, 126, 127,
    128, 129, 130, 131, 132, 133, 134, 135, 136, 137, 138, 139, 140, 141, 142, 143,
    144, 145, 146, 147, 148, 149, 150, 151, 152, 153, 154, 155, 156, 157, 158, 159,
    160, 161, 162, 163, 164, 165, 166, 167, 168, 169, 170, 171, 172, 173, 174, 175,
    176, 177, 178, 179, 180, 181, 182, 183, 184, 185, 186, 187, 188, 189, 190, 191,
    192, 193, 194, 195, 196, 197, 198, 199, 200, 201, 202, 203, 204, 205, 206, 207,
    208, 209, 210, 211, 212, 213, 214, 215, 216, 217, 218, 219, 220, 221, 222, 223,
    224, 225, 226, 227, 228, 229, 230, 231, 232, 233, 234, 235, 236, 237, 238, 239,
    240, 241, 242, 243, 244, 245, 246, 247, 248, 249, 250, 251, 252, 253, 254, 255,
];

/// Name length permutation for archives before version 500.
pub const SWAP_TABLE_LEGACY: [u8; 256] = [
    0, 1, 2, 72, 4, 5, 53, 7, 8, 11, 10, 9, 16, 19, 14, 15,
    12, 25, 18, 13, 20, 27, 22, 23, 24, 17, 26, 21, 30, 29, 28, 31,
    35, 33, 34, 32, 36, 37, 41, 39, 40, 38, 42, 43, 47, 45, 50, 44,
    48, 49, 46, 51, 52, 6, 54, 55, 56, 57, 58, 59, 60, 61, 62, 63,
    64, 65, 66, 67, 68, 69, 70, 71, 3, 73, 74, 75, 76, 77, 78, 79,
    80, 81, 82, 83, 84, 85, 86, 87, 88, 89, 90, 91, 92, 93, 94, 95,
    96, 97, 98, 99, 100, 101, 102, 103, 104, 105, 106, 107, 108, 109, 110, 111,
    112, 113, 114, 115, 116, 117, 118, 119, 120, 121, 122, 123, 124, 125, 126, 127,
    128, 129, 130, 131, 132, 133, 134, 135, 136, 137, 138, 139, 140, 141, 142, 143,
    144, 145, 146, 147, 148, 149, 150, 151, 152, 153, 154, 155, 156, 157, 158, 159,
    160, 161, 162, 163, 164, 165, 166, 167, 168, 169, 170, 171, 172, 173, 174, 175,
    176, 177, 178, 179, 180, 181, 182, 183, 184, 185, 186, 187, 188, 189, 190, 191,
    192, 193, 194, 195, 196, 197, 198, 199, 200, 201, 202, 203, 204, 205, 206, 207,
    208, 209, 210, 211, 212, 213, 214, 215, 216, 217, 218, 219, 220, 221, 222, 223,
    224, 225, 226, 227, 228, 229, 230, 231, 232, 233, 234, 235, 236, 237, 238, 239,
    240, 241, 242, 243, 244, 245, 246, 247, 248, 249, 250, 251, 252, 253, 254, 255,
];

/// Length permutation used by `version`
pub fn swap_table(version: u32) -> &'static [u8; 256] {
    if version >= SWAP_TABLE_V500_MIN_VERSION {
        &SWAP_TABLE_V500
    } else {
        &SWAP_TABLE_LEGACY
    }
}

/// Name byte cipher key used by `version`
pub fn cipher_key(version: u32) -> u8 {
    match version {
        290 => 64,
        v if v > 500 => 54,
        _ => 0,
    }
}

/// Recover the true name length from a stored length byte
pub fn decode_name_length(stored: u8, table: &[u8; 256]) -> usize {
    usize::from(table[usize::from(!stored)])
}

/// Produce the stored length byte for a name of `length` bytes
///
/// Returns `None` when no table slot maps to `length`.
pub fn encode_name_length(length: usize, table: &[u8; 256]) -> Option<u8> {
    table
        .iter()
        .position(|&value| usize::from(value) == length)
        .and_then(|index| u8::try_from(index).ok())
        .map(|index| !index)
}

/// Turn plain name bytes into stored bytes: `!(byte ^ key)`
pub fn cipher_name(plain: &[u8], key: u8) -> Vec<u8> {
    plain.iter().map(|&byte| !(byte ^ key)).collect()
}

/// Turn stored name bytes back into plain bytes: `!byte ^ key`
pub fn decipher_name(stored: &[u8], key: u8) -> Vec<u8> {
    stored.iter().map(|&byte| !byte ^ key).collect()
}

/// A name in its on-disk form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfuscatedName {
    /// Stored (complemented, permuted) length byte
    pub length_byte: u8,
    /// Stored (ciphered) name bytes
    pub bytes: Vec<u8>,
}

impl ObfuscatedName {
    /// Encode `name` with `codepage` and obfuscate it for `profile`
    pub fn encode(name: &str, profile: &FormatProfile, codepage: Codepage) -> YpfResult<Self> {
        let plain = codepage.encode(name);
        if plain.len() > MAX_NAME_LENGTH {
            return Err(YpfError::FilenameTooLong {
                name: name.to_string(),
                length: plain.len(),
            });
        }

        let length_byte = encode_name_length(plain.len(), profile.swap_table)
            .ok_or(YpfError::UnencodableNameLength(plain.len()))?;

        Ok(Self {
            length_byte,
            bytes: cipher_name(&plain, profile.cipher_key),
        })
    }

    /// Decode the stored bytes back to text
    pub fn decode(&self, profile: &FormatProfile, codepage: Codepage) -> String {
        codepage.decode(&decipher_name(&self.bytes, profile.cipher_key))
    }

    /// Checksum the directory records for this name
    pub fn checksum(&self, profile: &FormatProfile) -> u32 {
        profile.name_checksum(&self.bytes)
    }
}
