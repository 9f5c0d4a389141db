//! Command-line front end for YU-RIS YPF archives
//!
//! The `yuris` binary is a thin wrapper around this library: it parses a
//! [`ToolConfig`], installs logging, and hands the config to
//! [`commands::run`].
//!
//! # Example
//!
//! ```no_run
//! use yuris_tool::{ToolConfig, commands};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ToolConfig::from_args();
//!     config.validate()?;
//!     commands::run(&config, &mut std::io::stdout().lock())
//! }
//! ```

#![warn(missing_docs)]

pub mod commands;
pub mod config;
pub mod error;

pub use config::{Command, ToolConfig};
pub use error::ConfigError;
