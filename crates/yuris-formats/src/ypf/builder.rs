//! Building YPF archives
//!
//! Files are collected into a [`YpfBuilder`], then laid out in directory
//! order (ascending name checksum). Payloads follow the directory in the same
//! order, and identical payloads are stored once.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::codepage::Codepage;

use super::archive::write_file_atomic;
use super::directory::{self, ArchiveEntry, ArchiveHeader, HEADER_SIZE};
use super::error::{YpfError, YpfResult};
use super::file_kind::FileKind;
use super::obfuscation::ObfuscatedName;
use super::payload;
use super::profile::FormatProfile;

/// Version written when none is requested
pub const DEFAULT_VERSION: u32 = 500;

/// Separator joining path components in archive names
pub const DEFAULT_SEPARATOR: char = '\\';

/// Options controlling how an archive is packed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Archive format version
    pub version: u32,
    /// Code page for entry names
    pub codepage: Codepage,
    /// Separator between directory components in entry names
    pub separator: char,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            codepage: Codepage::default(),
            separator: DEFAULT_SEPARATOR,
        }
    }
}

impl PackOptions {
    /// Options for `version` and `codepage` with the default separator
    pub fn new(version: u32, codepage: Codepage) -> Self {
        Self {
            version,
            codepage,
            separator: DEFAULT_SEPARATOR,
        }
    }

    /// Options for `version`, resolving `codepage` by number
    pub fn with_codepage_id(version: u32, codepage: u32) -> YpfResult<Self> {
        let codepage =
            Codepage::from_id(codepage).ok_or(YpfError::UnsupportedCodepage(codepage))?;
        Ok(Self::new(version, codepage))
    }
}

#[derive(Debug)]
struct PendingFile {
    name: String,
    stored_name: ObfuscatedName,
    name_checksum: u32,
    data: Vec<u8>,
}

/// Result of packing
#[derive(Debug, Clone)]
pub struct PackedArchive {
    /// Complete archive bytes
    pub data: Vec<u8>,
    /// Directory records in directory order
    pub entries: Vec<ArchiveEntry>,
    /// Entries that reused an earlier entry's payload
    pub shared_payloads: usize,
}

/// Collects named files and lays them out as a YPF archive
#[derive(Debug)]
pub struct YpfBuilder {
    options: PackOptions,
    profile: FormatProfile,
    files: Vec<PendingFile>,
    // Stored name bytes; distinct source names can encode to the same bytes
    names: HashSet<Vec<u8>>,
}

impl YpfBuilder {
    /// Create an empty builder
    pub fn new(options: PackOptions) -> Self {
        Self {
            profile: FormatProfile::for_version(options.version),
            options,
            files: Vec::new(),
            names: HashSet::new(),
        }
    }

    /// Options this builder packs with
    pub fn options(&self) -> &PackOptions {
        &self.options
    }

    /// Number of files added so far
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no files have been added
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Add a file under its archive name
    ///
    /// The name is validated and obfuscated immediately, so a bad name fails
    /// here rather than at [`build`](Self::build).
    pub fn add_file(&mut self, name: impl Into<String>, data: Vec<u8>) -> YpfResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(YpfError::EmptyFilename(PathBuf::new()));
        }
        if data.is_empty() {
            return Err(YpfError::EmptyFile(PathBuf::from(&name)));
        }
        if u32::try_from(data.len()).is_err() {
            return Err(YpfError::FileTooLarge {
                path: PathBuf::from(&name),
                size: data.len() as u64,
            });
        }

        let stored_name = ObfuscatedName::encode(&name, &self.profile, self.options.codepage)?;
        if !self.names.insert(stored_name.bytes.clone()) {
            return Err(YpfError::DuplicateFilename(name));
        }
        let name_checksum = stored_name.checksum(&self.profile);

        debug!("Queued {} ({} bytes)", name, data.len());
        self.files.push(PendingFile {
            name,
            stored_name,
            name_checksum,
            data,
        });
        Ok(())
    }

    /// Lay out and serialize the archive
    pub fn build(mut self) -> YpfResult<PackedArchive> {
        let profile = self.profile;

        let directory_size = self.files.iter().fold(HEADER_SIZE as u64, |size, file| {
            size + profile.entry_record_size(file.stored_name.bytes.len()) as u64
        });
        let directory_size_u32 =
            u32::try_from(directory_size).map_err(|_| YpfError::OutputSizeExceeded {
                size: directory_size,
                limit: u64::from(u32::MAX),
                version: profile.version,
            })?;
        let entry_count =
            u32::try_from(self.files.len()).map_err(|_| YpfError::OutputSizeExceeded {
                size: directory_size,
                limit: u64::from(u32::MAX),
                version: profile.version,
            })?;

        self.files.sort_by(|a, b| {
            a.name_checksum
                .cmp(&b.name_checksum)
                .then_with(|| a.name.cmp(&b.name))
        });

        // (data checksum, raw size) -> indices into `records` of payload owners
        let mut seen: HashMap<(u32, u32), Vec<usize>> = HashMap::new();
        let mut records: Vec<(ArchiveEntry, ObfuscatedName)> = Vec::with_capacity(self.files.len());
        let mut payloads: Vec<u8> = Vec::new();
        let mut shared_payloads = 0usize;

        for file in self.files {
            // add_file bounds the size to u32
            let raw_size = file.data.len() as u32;
            let stored =
                payload::store(&file.data).map_err(|source| YpfError::CompressionFailure {
                    name: file.name.clone(),
                    source,
                })?;
            let data_checksum = profile.data_checksum(&stored.bytes);

            let mut entry = ArchiveEntry {
                name_checksum: file.name_checksum,
                file_type: FileKind::for_name(&file.name).tag(),
                name: file.name,
                is_compressed: stored.is_compressed,
                raw_size,
                compressed_size: 0,
                offset: 0,
                data_checksum,
            };

            let owners = seen.entry((data_checksum, raw_size)).or_default();
            // A matching checksum is only a candidate; the stored bytes decide.
            let shared = owners.iter().map(|&owner| &records[owner].0).find(|first| {
                first.is_compressed == stored.is_compressed
                    && stored_bytes(&payloads, first, directory_size) == Some(&stored.bytes[..])
            });

            if let Some(first) = shared {
                entry.offset = first.offset;
                entry.compressed_size = first.compressed_size;
                debug!("{} shares the payload of {}", entry.name, first.name);
                shared_payloads += 1;
            } else {
                entry.offset = payloads.len() as u64 + directory_size;
                entry.compressed_size = stored.bytes.len() as u32;
                payloads.extend_from_slice(&stored.bytes);
                owners.push(records.len());
            }

            records.push((entry, file.stored_name));
        }

        let total_size = directory_size + payloads.len() as u64;
        if total_size > profile.max_archive_size() {
            return Err(YpfError::OutputSizeExceeded {
                size: total_size,
                limit: profile.max_archive_size(),
                version: profile.version,
            });
        }

        let header = ArchiveHeader::new(profile.version, entry_count, directory_size_u32);
        let mut data = directory::write_directory(&header, &records)?;
        data.extend_from_slice(&payloads);

        info!(
            "Packed {} entries ({} shared) into {} bytes, version {}",
            records.len(),
            shared_payloads,
            data.len(),
            profile.version
        );

        Ok(PackedArchive {
            data,
            entries: records.into_iter().map(|(entry, _)| entry).collect(),
            shared_payloads,
        })
    }
}

/// Bytes already appended to `payloads` for `entry`
fn stored_bytes<'a>(
    payloads: &'a [u8],
    entry: &ArchiveEntry,
    directory_size: u64,
) -> Option<&'a [u8]> {
    let start = usize::try_from(entry.offset.checked_sub(directory_size)?).ok()?;
    let end = start.checked_add(entry.compressed_size as usize)?;
    payloads.get(start..end)
}

/// Archive name for `path` relative to `root`, joined with `separator`
fn archive_name(root: &Path, path: &Path, separator: char) -> YpfResult<String> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| YpfError::EmptyFilename(path.to_path_buf()))?;

    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return Err(YpfError::EmptyFilename(path.to_path_buf()));
    }

    Ok(parts.join(&separator.to_string()))
}

/// Collect every regular file under `source_root` into a builder
///
/// Symbolic links are not followed. Errors carry the offending source path.
pub fn collect_files(source_root: &Path, options: PackOptions) -> YpfResult<YpfBuilder> {
    let mut builder = YpfBuilder::new(options);

    for entry in WalkDir::new(source_root)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| YpfError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let name = archive_name(source_root, path, options.separator)?;

        let size = entry.metadata().map_err(|e| YpfError::Io(e.into()))?.len();
        if size == 0 {
            return Err(YpfError::EmptyFile(path.to_path_buf()));
        }
        if size > u64::from(u32::MAX) {
            return Err(YpfError::FileTooLarge {
                path: path.to_path_buf(),
                size,
            });
        }

        let data = fs::read(path)?;
        builder.add_file(name, data).map_err(|err| match err {
            YpfError::EmptyFile(_) => YpfError::EmptyFile(path.to_path_buf()),
            YpfError::EmptyFilename(_) => YpfError::EmptyFilename(path.to_path_buf()),
            other => other,
        })?;
    }

    info!(
        "Collected {} files from {}",
        builder.len(),
        source_root.display()
    );
    Ok(builder)
}

/// Pack every file under `source_root` with explicit options
pub fn pack_with_options(source_root: &Path, options: PackOptions) -> YpfResult<Vec<u8>> {
    Ok(collect_files(source_root, options)?.build()?.data)
}

/// Pack every file under `source_root`
///
/// Names use `\` between components. `codepage` is a Windows code page
/// number; [`DEFAULT_CODEPAGE`](crate::codepage::DEFAULT_CODEPAGE) is
/// Shift-JIS.
pub fn pack(source_root: &Path, version: u32, codepage: u32) -> YpfResult<Vec<u8>> {
    pack_with_options(source_root, PackOptions::with_codepage_id(version, codepage)?)
}

/// Pack `source_root` and write the archive to `output`
///
/// The archive is written to a temporary file next to `output` and renamed
/// into place, so a failed pack never leaves a partial archive behind.
pub fn pack_to_file(
    source_root: &Path,
    output: &Path,
    options: PackOptions,
) -> YpfResult<PackedArchive> {
    let packed = collect_files(source_root, options)?.build()?;
    write_file_atomic(output, &packed.data)?;
    info!("Wrote {}", output.display());
    Ok(packed)
}
