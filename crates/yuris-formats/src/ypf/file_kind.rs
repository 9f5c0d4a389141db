//! Coarse file kind tags stored per directory entry

use std::fmt;

/// File kind hint derived from the extension at pack time
///
/// The engine does not check this value when reading, so parsed entries keep
/// the raw tag and map it through [`FileKind::from_tag`] on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FileKind {
    /// Text, scripts, and anything unrecognised
    Text = 0,
    /// Windows bitmap
    Bitmap = 1,
    /// PNG image
    Png = 2,
    /// JPEG image
    Jpeg = 3,
    /// GIF image
    Gif = 4,
    /// RIFF wave audio
    Wave = 5,
    /// Ogg Vorbis audio
    Ogg = 6,
    /// Photoshop document
    Psd = 7,
    /// YU-RIS compressed graphic
    Ycg = 8,
    /// Photoshop big document
    Psb = 9,
}

impl FileKind {
    /// Parse from the stored tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Text),
            1 => Some(Self::Bitmap),
            2 => Some(Self::Png),
            3 => Some(Self::Jpeg),
            4 => Some(Self::Gif),
            5 => Some(Self::Wave),
            6 => Some(Self::Ogg),
            7 => Some(Self::Psd),
            8 => Some(Self::Ycg),
            9 => Some(Self::Psb),
            _ => None,
        }
    }

    /// Stored tag value
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Kind for a bare extension (without the dot), case-insensitive
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_ascii_lowercase().as_str() {
            "bmp" => Self::Bitmap,
            "png" => Self::Png,
            "jpg" | "jpeg" => Self::Jpeg,
            "gif" => Self::Gif,
            "wav" => Self::Wave,
            "ogg" => Self::Ogg,
            "psd" => Self::Psd,
            "ycg" => Self::Ycg,
            "psb" => Self::Psb,
            _ => Self::Text,
        }
    }

    /// Kind for an archive name, using the text after the last dot
    ///
    /// Both `\` and `/` are treated as separators so a dot in a directory
    /// name is not mistaken for an extension.
    pub fn for_name(name: &str) -> Self {
        let file_name = name.rsplit(['\\', '/']).next().unwrap_or(name);
        match file_name.rsplit_once('.') {
            Some((stem, extension)) if !stem.is_empty() => Self::from_extension(extension),
            _ => Self::Text,
        }
    }

    /// Short lowercase label
    pub const fn label(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Bitmap => "bmp",
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Wave => "wav",
            Self::Ogg => "ogg",
            Self::Psd => "psd",
            Self::Ycg => "ycg",
            Self::Psb => "psb",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
