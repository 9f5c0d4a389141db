//! Command-line configuration.
//!
//! Global options can also come from the environment:
//! - `YURIS_CODEPAGE`: Windows code page for entry names (default 932)
//!
//! # Example
//!
//! ```no_run
//! use yuris_tool::ToolConfig;
//!
//! let config = ToolConfig::from_args();
//! config.validate().expect("Invalid configuration");
//! println!("Names decoded as {}", config.codepage().expect("validated"));
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yuris_formats::codepage::{Codepage, DEFAULT_CODEPAGE};
use yuris_formats::ypf::{DEFAULT_SEPARATOR, DEFAULT_VERSION, PackOptions};

use crate::error::ConfigError;

/// Tool configuration loaded from CLI args and environment variables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "yuris",
    about = "List, extract, verify and pack YU-RIS YPF archives",
    version
)]
pub struct ToolConfig {
    /// Windows code page used for entry names
    #[arg(
        long,
        global = true,
        env = "YURIS_CODEPAGE",
        default_value_t = DEFAULT_CODEPAGE
    )]
    pub codepage: u32,

    /// Log per-entry progress
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Operation to run
    #[command(subcommand)]
    pub command: Command,
}

/// Tool operations.
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// List archive entries
    List {
        /// Archive to read
        archive: PathBuf,
        /// Include checksums and stored name checksum order
        #[arg(long)]
        long: bool,
    },

    /// Show the archive header and payload statistics
    Info {
        /// Archive to read
        archive: PathBuf,
    },

    /// Extract entries into a directory
    Extract {
        /// Archive to read
        archive: PathBuf,
        /// Destination root
        dest: PathBuf,
        /// Extract a single entry by name
        #[arg(long)]
        only: Option<String>,
    },

    /// Check every payload against its checksum
    Verify {
        /// Archive to read
        archive: PathBuf,
    },

    /// Pack a directory tree into an archive
    Pack {
        /// Source directory
        source: PathBuf,
        /// Archive to write
        output: PathBuf,
        /// Archive format version
        #[arg(long, default_value_t = DEFAULT_VERSION)]
        version: u32,
        /// Separator between directory components in entry names
        #[arg(long, default_value_t = DEFAULT_SEPARATOR)]
        separator: char,
    },
}

impl ToolConfig {
    /// Parse configuration from command-line arguments.
    #[must_use]
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Resolve the configured code page.
    pub fn codepage(&self) -> Result<Codepage, ConfigError> {
        Codepage::from_id(self.codepage).ok_or(ConfigError::UnsupportedCodepage(self.codepage))
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub const fn log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Pack options for a `pack` command, `None` for other commands.
    pub fn pack_options(&self) -> Result<Option<PackOptions>, ConfigError> {
        match self.command {
            Command::Pack {
                version, separator, ..
            } => Ok(Some(PackOptions {
                version,
                codepage: self.codepage()?,
                separator,
            })),
            _ => Ok(None),
        }
    }

    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - The code page is not supported
    /// - A pack separator is neither `\` nor `/`
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.codepage()?;

        if let Command::Pack { separator, .. } = self.command
            && separator != '\\'
            && separator != '/'
        {
            return Err(ConfigError::InvalidSeparator(separator));
        }

        Ok(())
    }
}
