//! Command implementations.
//!
//! Each command writes its human-readable output to the supplied writer and
//! returns an error for anything that should end the process unsuccessfully.

use anyhow::{Context, Result, bail};
use std::io::Write;
use std::path::Path;
use tracing::info;
use yuris_formats::codepage::Codepage;
use yuris_formats::ypf::{self, PackOptions, YpfArchive};

use crate::config::{Command, ToolConfig};

/// Run the configured command.
pub fn run<W: Write>(config: &ToolConfig, out: &mut W) -> Result<()> {
    let codepage = config.codepage()?;

    match &config.command {
        Command::List { archive, long } => list(archive, codepage, *long, out),
        Command::Info { archive } => show_info(archive, codepage, out),
        Command::Extract {
            archive,
            dest,
            only,
        } => extract(archive, dest, only.as_deref(), codepage, out),
        Command::Verify { archive } => verify(archive, codepage, out),
        Command::Pack { source, output, .. } => {
            let options = config
                .pack_options()?
                .context("pack command without pack options")?;
            pack(source, output, options, out)
        }
    }
}

fn open(archive: &Path, codepage: Codepage) -> Result<YpfArchive> {
    YpfArchive::open(archive, codepage)
        .with_context(|| format!("Failed to read archive {}", archive.display()))
}

/// Print one line per entry in directory order.
pub fn list<W: Write>(archive: &Path, codepage: Codepage, long: bool, out: &mut W) -> Result<()> {
    let archive = open(archive, codepage)?;

    for entry in archive.info().directory_order() {
        let kind = entry
            .kind()
            .map_or_else(|| format!("#{}", entry.file_type), |kind| kind.to_string());
        let compressed = if entry.is_compressed { "z" } else { "-" };

        if long {
            writeln!(
                out,
                "{:<5} {} {:>10} {:>10} {:>12} {:08x} {:08x} {}",
                kind,
                compressed,
                entry.raw_size,
                entry.compressed_size,
                entry.offset,
                entry.name_checksum,
                entry.data_checksum,
                entry.name
            )?;
        } else {
            writeln!(
                out,
                "{:<5} {} {:>10} {:>10} {:>12} {}",
                kind, compressed, entry.raw_size, entry.compressed_size, entry.offset, entry.name
            )?;
        }
    }

    Ok(())
}

/// Print the header summary and payload statistics.
pub fn show_info<W: Write>(archive_path: &Path, codepage: Codepage, out: &mut W) -> Result<()> {
    let archive = open(archive_path, codepage)?;
    let info = archive.info();
    let profile = info.profile();
    let unique = info.unique_payloads();

    writeln!(out, "Archive:        {}", archive_path.display())?;
    writeln!(out, "Version:        {}", info.header.version)?;
    writeln!(out, "Entries:        {}", info.header.entry_count)?;
    writeln!(out, "Directory size: {}", info.header.directory_size)?;
    writeln!(out, "Archive size:   {}", archive.data().len())?;
    writeln!(out, "Checksums:      {:?}", profile.checksum)?;
    writeln!(out, "Offset width:   {} bytes", profile.offset_width.size())?;
    writeln!(out, "Code page:      {codepage}")?;
    writeln!(out, "Payloads:       {unique} unique")?;
    writeln!(
        out,
        "Shared entries: {}",
        info.entries.len().saturating_sub(unique)
    )?;
    writeln!(out, "Raw total:      {}", info.total_raw_size())?;

    Ok(())
}

/// Extract everything, or a single named entry, under `dest`.
pub fn extract<W: Write>(
    archive_path: &Path,
    dest: &Path,
    only: Option<&str>,
    codepage: Codepage,
    out: &mut W,
) -> Result<()> {
    let archive = open(archive_path, codepage)?;

    if let Some(name) = only {
        let entry = archive
            .info()
            .find(name)
            .with_context(|| format!("No entry named {name} in {}", archive_path.display()))?;
        let target = ypf::entry_path(dest, &entry.name)?;
        let contents = archive.extract(entry)?;
        ypf::write_file_atomic(&target, &contents)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        writeln!(out, "Extracted {} to {}", entry.name, target.display())?;
        return Ok(());
    }

    archive
        .extract_all(dest)
        .with_context(|| format!("Failed to extract {}", archive_path.display()))?;
    writeln!(
        out,
        "Extracted {} entries to {}",
        archive.entries().len(),
        dest.display()
    )?;
    Ok(())
}

/// Check every payload; mismatches are printed and fail the command.
pub fn verify<W: Write>(archive_path: &Path, codepage: Codepage, out: &mut W) -> Result<()> {
    let archive = open(archive_path, codepage)?;
    let report = archive
        .verify()
        .with_context(|| format!("Failed to verify {}", archive_path.display()))?;

    for mismatch in &report.checksum_mismatches {
        writeln!(out, "MISMATCH {mismatch}")?;
    }
    writeln!(
        out,
        "Checked {} entries, {} checksum mismatches",
        report.entries_checked,
        report.checksum_mismatches.len()
    )?;

    if !report.is_clean() {
        bail!(
            "{} entries failed checksum verification",
            report.checksum_mismatches.len()
        );
    }
    Ok(())
}

/// Pack `source` into `output`.
pub fn pack<W: Write>(
    source: &Path,
    output: &Path,
    options: PackOptions,
    out: &mut W,
) -> Result<()> {
    info!(
        "Packing {} as version {} ({})",
        source.display(),
        options.version,
        options.codepage
    );
    let packed = ypf::pack_to_file(source, output, options)
        .with_context(|| format!("Failed to pack {}", source.display()))?;

    writeln!(
        out,
        "Packed {} entries ({} shared) into {} ({} bytes)",
        packed.entries.len(),
        packed.shared_payloads,
        output.display(),
        packed.data.len()
    )?;
    Ok(())
}
