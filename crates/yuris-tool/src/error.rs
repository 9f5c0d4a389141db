//! Error types for the command-line tool.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Code page number has no known encoding
    #[error("Unsupported code page: {0}")]
    UnsupportedCodepage(u32),

    /// Separator other than `\` or `/`
    #[error("Invalid path separator '{0}': expected '\\' or '/'")]
    InvalidSeparator(char),
}
