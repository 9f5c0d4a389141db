//! Reading YPF archives
//!
//! Parsing only decodes the directory. Payloads are read on demand from the
//! same buffer, which stays borrowed (or owned by [`YpfArchive`]) for the
//! lifetime of the view.

use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::codepage::Codepage;

use super::directory::{self, ArchiveEntry, ArchiveHeader};
use super::error::{YpfError, YpfResult};
use super::payload;
use super::profile::FormatProfile;

/// Parsed archive directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Archive header
    pub header: ArchiveHeader,
    /// Entries in payload order (ascending offset)
    pub entries: Vec<ArchiveEntry>,
}

impl ArchiveInfo {
    /// Layout parameters for this archive
    pub fn profile(&self) -> FormatProfile {
        self.header.profile()
    }

    /// Find an entry by name, treating `\` and `/` as the same separator
    pub fn find(&self, name: &str) -> Option<&ArchiveEntry> {
        let wanted = normalize_separators(name);
        self.entries
            .iter()
            .find(|entry| normalize_separators(&entry.name) == wanted)
    }

    /// Entries in directory order (ascending name checksum)
    pub fn directory_order(&self) -> Vec<&ArchiveEntry> {
        let mut entries: Vec<&ArchiveEntry> = self.entries.iter().collect();
        entries.sort_by_key(|entry| entry.name_checksum);
        entries
    }

    /// Number of distinct payloads referenced by the directory
    pub fn unique_payloads(&self) -> usize {
        let mut offsets: Vec<u64> = self.entries.iter().map(|entry| entry.offset).collect();
        offsets.sort_unstable();
        offsets.dedup();
        offsets.len()
    }

    /// Sum of raw sizes over all entries
    pub fn total_raw_size(&self) -> u64 {
        self.entries
            .iter()
            .map(|entry| u64::from(entry.raw_size))
            .sum()
    }
}

fn normalize_separators(name: &str) -> String {
    name.replace('\\', "/")
}

/// Parse an archive's header and directory
///
/// Entries come back sorted by payload offset; the directory's own order
/// (by name checksum) is available through [`ArchiveInfo::directory_order`].
pub fn parse(data: &[u8], codepage: Codepage) -> YpfResult<ArchiveInfo> {
    let (header, mut entries) = directory::read_directory(data, codepage)?;
    entries.sort_by_key(|entry| entry.offset);

    debug!(
        "Parsed YPF v{} with {} entries, directory {} bytes",
        header.version,
        entries.len(),
        header.directory_size
    );

    Ok(ArchiveInfo { header, entries })
}

fn stored_payload<'a>(data: &'a [u8], entry: &ArchiveEntry) -> YpfResult<&'a [u8]> {
    let truncated = || YpfError::TruncatedInput {
        context: format!("payload of {}", entry.name),
    };
    let start = usize::try_from(entry.offset).map_err(|_| truncated())?;
    let end = usize::try_from(entry.payload_end()).map_err(|_| truncated())?;
    data.get(start..end).ok_or_else(truncated)
}

fn check_data_checksum(
    stored: &[u8],
    entry: &ArchiveEntry,
    profile: &FormatProfile,
) -> Result<(), YpfError> {
    let actual = profile.data_checksum(stored);
    if actual != entry.data_checksum {
        return Err(YpfError::DataChecksumMismatch {
            name: entry.name.clone(),
            expected: entry.data_checksum,
            actual,
        });
    }
    Ok(())
}

/// Extract one entry's raw bytes
///
/// A data checksum mismatch is logged and extraction continues with the
/// stored bytes. Bad magic, an out-of-range payload, or a failed inflate
/// are errors.
pub fn extract_one(data: &[u8], entry: &ArchiveEntry) -> YpfResult<Vec<u8>> {
    let header = ArchiveHeader::parse(data)?;
    let profile = header.profile();

    let stored = stored_payload(data, entry)?;
    if let Err(mismatch) = check_data_checksum(stored, entry, &profile) {
        warn!("{mismatch}");
    }

    payload::load(stored, entry.is_compressed, entry.raw_size).map_err(|source| {
        YpfError::DecompressionFailure {
            name: entry.name.clone(),
            source,
        }
    })
}

/// Map an archive name to a path under `root`
///
/// Both `\` and `/` separate components. Empty, `.` and `..` components,
/// drive prefixes, and absolute names are rejected.
pub fn entry_path(root: &Path, name: &str) -> YpfResult<PathBuf> {
    let mut path = root.to_path_buf();
    let mut components = 0usize;

    for part in name.split(['\\', '/']) {
        if part.is_empty() || part.contains(':') {
            return Err(YpfError::UnsafePath(name.to_string()));
        }
        let mut parsed = Path::new(part).components();
        match (parsed.next(), parsed.next()) {
            (Some(Component::Normal(segment)), None) => path.push(segment),
            _ => return Err(YpfError::UnsafePath(name.to_string())),
        }
        components += 1;
    }

    if components == 0 {
        return Err(YpfError::UnsafePath(name.to_string()));
    }
    Ok(path)
}

/// Write `contents` to `path` through a temporary file in the same directory
///
/// Missing parent directories are created. The file only appears at `path`
/// once it is complete.
pub fn write_file_atomic(path: &Path, contents: &[u8]) -> YpfResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.flush()?;
    temp.persist(path).map_err(|e| YpfError::Io(e.error))?;
    Ok(())
}

/// Extract every entry under `dest_root`
///
/// Entries are read in payload order. The first hard failure aborts the
/// whole extraction; files already written stay in place, and no file is
/// ever left half-written.
pub fn extract_all(data: &[u8], entries: &[ArchiveEntry], dest_root: &Path) -> YpfResult<()> {
    ArchiveHeader::parse(data)?;
    fs::create_dir_all(dest_root)?;

    let mut ordered: Vec<&ArchiveEntry> = entries.iter().collect();
    ordered.sort_by_key(|entry| entry.offset);

    for entry in &ordered {
        let target = entry_path(dest_root, &entry.name)?;
        let contents = extract_one(data, entry)?;
        write_file_atomic(&target, &contents)?;
        debug!("Extracted {} ({} bytes)", entry.name, contents.len());
    }

    info!(
        "Extracted {} entries to {}",
        ordered.len(),
        dest_root.display()
    );
    Ok(())
}

/// Result of checking every payload in an archive
#[derive(Debug, Default)]
pub struct VerifyReport {
    /// Entries examined
    pub entries_checked: usize,
    /// Payloads whose stored checksum did not match
    pub checksum_mismatches: Vec<YpfError>,
}

impl VerifyReport {
    /// Whether every payload matched its checksum
    pub fn is_clean(&self) -> bool {
        self.checksum_mismatches.is_empty()
    }
}

/// Check bounds, checksums and decompression of every entry
///
/// Checksum mismatches are collected into the report; anything that would
/// make extraction fail is returned as an error.
pub fn verify(data: &[u8], info: &ArchiveInfo) -> YpfResult<VerifyReport> {
    let header = ArchiveHeader::parse(data)?;
    let profile = header.profile();
    let mut report = VerifyReport::default();

    for entry in &info.entries {
        let stored = stored_payload(data, entry)?;
        if let Err(mismatch) = check_data_checksum(stored, entry, &profile) {
            warn!("{mismatch}");
            report.checksum_mismatches.push(mismatch);
        }
        payload::load(stored, entry.is_compressed, entry.raw_size).map_err(|source| {
            YpfError::DecompressionFailure {
                name: entry.name.clone(),
                source,
            }
        })?;
        report.entries_checked += 1;
    }

    info!(
        "Verified {} entries, {} checksum mismatches",
        report.entries_checked,
        report.checksum_mismatches.len()
    );
    Ok(report)
}

/// An archive held in memory together with its parsed directory
#[derive(Debug, Clone)]
pub struct YpfArchive {
    data: Vec<u8>,
    info: ArchiveInfo,
}

impl YpfArchive {
    /// Parse an archive from owned bytes
    pub fn from_bytes(data: Vec<u8>, codepage: Codepage) -> YpfResult<Self> {
        let info = parse(&data, codepage)?;
        Ok(Self { data, info })
    }

    /// Read and parse an archive file
    pub fn open<P: AsRef<Path>>(path: P, codepage: Codepage) -> YpfResult<Self> {
        let path = path.as_ref();
        info!("Opening YPF archive {}", path.display());
        Self::from_bytes(fs::read(path)?, codepage)
    }

    /// Parsed directory
    pub fn info(&self) -> &ArchiveInfo {
        &self.info
    }

    /// Entries in payload order
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.info.entries
    }

    /// Raw archive bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Extract one entry
    pub fn extract(&self, entry: &ArchiveEntry) -> YpfResult<Vec<u8>> {
        extract_one(&self.data, entry)
    }

    /// Extract one entry by name
    pub fn extract_by_name(&self, name: &str) -> YpfResult<Option<Vec<u8>>> {
        self.info
            .find(name)
            .map(|entry| self.extract(entry))
            .transpose()
    }

    /// Extract every entry under `dest_root`
    pub fn extract_all(&self, dest_root: &Path) -> YpfResult<()> {
        extract_all(&self.data, &self.info.entries, dest_root)
    }

    /// Check every payload
    pub fn verify(&self) -> YpfResult<VerifyReport> {
        verify(&self.data, &self.info)
    }
}
