//! File format parsers and builders for the YU-RIS visual novel engine
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::uninlined_format_args)] // Backwards compatibility
#![allow(clippy::doc_markdown)] // Engine-specific terms don't need backticks
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::redundant_closure_for_method_calls)] // Iterator chains
//! This crate provides a symmetric (parser and builder) implementation of the
//! YPF resource archive, along with the legacy code page handling its entry
//! names depend on.
//!
//! # Supported Formats
//!
//! - **YPF**: Resource archive holding scripts, images and audio
//!
//! # Design Principles
//!
//! - **Symmetric Operations**: Both parsing and building supported
//! - **Version Profiles**: Every version-dependent rule is resolved in one place
//! - **Round-Trip Guarantee**: extracting a packed tree yields the same files

#![warn(missing_docs)]

/// Windows code page text encoding for entry names
pub mod codepage;
/// YPF archive reading and writing
///
/// See the [`ypf`] module documentation for the layout and an example.
pub mod ypf;

pub use codepage::{Codepage, DEFAULT_CODEPAGE};
pub use ypf::{ArchiveEntry, ArchiveInfo, PackOptions, YpfArchive, YpfBuilder, YpfError, YpfResult};
