//! Legacy code page text handling
//!
//! YU-RIS tools store names and strings in the Windows ANSI code page of the
//! machine that produced them, most often Shift-JIS (932). Code pages are
//! identified by their Windows number and backed by `encoding_rs`.

use encoding_rs::{EncoderResult, Encoding};
use std::fmt;

/// Code page used when none is configured (Shift-JIS)
pub const DEFAULT_CODEPAGE: u32 = 932;

/// Byte written in place of characters the code page cannot represent
pub const REPLACEMENT_BYTE: u8 = b'?';

/// A Windows code page resolved to an encoder/decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codepage {
    id: u32,
    encoding: &'static Encoding,
}

impl Codepage {
    /// Resolve a Windows code page number
    pub fn from_id(id: u32) -> Option<Self> {
        let encoding = match id {
            866 => encoding_rs::IBM866,
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GBK,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1252 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            20866 => encoding_rs::KOI8_R,
            20932 => encoding_rs::EUC_JP,
            54936 => encoding_rs::GB18030,
            65001 => encoding_rs::UTF_8,
            _ => return None,
        };
        Some(Self { id, encoding })
    }

    /// Windows code page number
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Canonical encoding name
    pub fn name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Decode bytes, replacing malformed sequences with U+FFFD
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }

    /// Encode text, writing [`REPLACEMENT_BYTE`] for unmappable characters
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut encoder = self.encoding.new_encoder();
        let mut out = Vec::with_capacity(text.len());
        let mut buffer = [0u8; 1024];
        let mut rest = text;

        loop {
            let (result, read, written) =
                encoder.encode_from_utf8_without_replacement(rest, &mut buffer, true);
            out.extend_from_slice(&buffer[..written]);
            rest = &rest[read..];

            match result {
                EncoderResult::InputEmpty => break,
                EncoderResult::OutputFull => {}
                EncoderResult::Unmappable(_) => out.push(REPLACEMENT_BYTE),
            }
        }

        out
    }
}

impl Default for Codepage {
    fn default() -> Self {
        Self {
            id: DEFAULT_CODEPAGE,
            encoding: encoding_rs::SHIFT_JIS,
        }
    }
}

impl fmt::Display for Codepage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.encoding.name())
    }
}

/// Decode `bytes` from `codepage`
pub fn decode_bytes(bytes: &[u8], codepage: Codepage) -> String {
    codepage.decode(bytes)
}

/// Encode `text` into `codepage`
pub fn encode_string(text: &str, codepage: Codepage) -> Vec<u8> {
    codepage.encode(text)
}
