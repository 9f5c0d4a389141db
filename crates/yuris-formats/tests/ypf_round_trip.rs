//! Integration tests for packing source trees and extracting them again

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;
use yuris_formats::codepage::Codepage;
use yuris_formats::ypf::{
    self, ArchiveHeader, FileKind, PackOptions, YpfArchive, YpfBuilder, YpfError,
};

fn write_file(root: &Path, relative: &str, contents: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// Relative path (with `/`) to contents for every file under `root`
fn read_tree(root: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| {
            let relative = entry
                .path()
                .strip_prefix(root)
                .unwrap()
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            (relative, fs::read(entry.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

fn sample_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let script = b"#=SCENE\n@bg title\n".repeat(64);
    let root = dir.path();
    write_file(root, "ysbin/yst00001.ybn", &script);
    write_file(root, "ysbin/yst00002.ybn", b"\x01\x02\x03");
    write_file(root, "bg/title.png", b"\x89PNG\r\n\x1a\nnot really a png");
    write_file(root, "se/click.ogg", b"OggS");
    write_file(root, "se/copy_of_click.ogg", b"OggS");
    write_file(root, "config.txt", b"width=1280\nheight=720\n");
    dir
}

fn round_trip(version: u32) {
    let source = sample_tree();
    let data = ypf::pack(source.path(), version, 932).unwrap();

    let header = ArchiveHeader::parse(&data).unwrap();
    assert_eq!(header.version, version);
    assert_eq!(header.entry_count, 6);

    let info = ypf::parse(&data, Codepage::default()).unwrap();
    assert_eq!(info.entries.len(), 6);
    assert!(info.find("ysbin\\yst00001.ybn").is_some());
    assert!(info.entries.iter().all(|e| !e.name.contains('/')));

    let dest = TempDir::new().unwrap();
    ypf::extract_all(&data, &info.entries, dest.path()).unwrap();
    assert_eq!(read_tree(dest.path()), read_tree(source.path()));
}

#[test]
fn ypf_round_trip_v290() {
    round_trip(290);
}

#[test]
fn ypf_round_trip_v478() {
    round_trip(478);
}

#[test]
fn ypf_round_trip_v479() {
    round_trip(479);
}

#[test]
fn ypf_round_trip_v500() {
    round_trip(500);
}

#[test]
fn ypf_round_trip_v501() {
    round_trip(501);
}

#[test]
fn ypf_shift_jis_names_survive() {
    let source = TempDir::new().unwrap();
    write_file(source.path(), "背景/タイトル.png", b"png bytes");

    let data = ypf::pack(source.path(), 500, 932).unwrap();
    let info = ypf::parse(&data, Codepage::default()).unwrap();
    assert_eq!(info.entries[0].name, "背景\\タイトル.png");
    assert_eq!(info.entries[0].kind(), Some(FileKind::Png));

    // Shift-JIS length: 4 + 1 + 8 + 4 bytes, where UTF-8 would need 23.
    let stored_len = info.header.directory_size as usize - 32 - 19 - 8;
    assert_eq!(stored_len, 17);
}

#[test]
fn ypf_identical_files_stored_once() {
    let source = TempDir::new().unwrap();
    let body = b"the same body in two places ".repeat(40);
    write_file(source.path(), "a/one.txt", &body);
    write_file(source.path(), "b/two.txt", &body);
    write_file(source.path(), "c.txt", b"other");

    let data = ypf::pack(source.path(), 500, 932).unwrap();
    let info = ypf::parse(&data, Codepage::default()).unwrap();
    let one = info.find("a\\one.txt").unwrap();
    let two = info.find("b/two.txt").unwrap();

    assert_eq!(one.offset, two.offset);
    assert_eq!(info.unique_payloads(), 2);

    let payload_bytes = data.len() as u64 - u64::from(info.header.directory_size);
    let other = info.find("c.txt").unwrap();
    assert_eq!(
        payload_bytes,
        u64::from(one.compressed_size) + u64::from(other.compressed_size)
    );
}

#[test]
fn ypf_incompressible_payload_stored_raw() {
    let mut state = 0x9E37_79B9u32;
    let noise: Vec<u8> = (0..2048)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state as u8
        })
        .collect();

    let mut builder = YpfBuilder::new(PackOptions::default());
    builder.add_file("noise.bin", noise.clone()).unwrap();
    let packed = builder.build().unwrap();

    let entry = &packed.entries[0];
    assert!(!entry.is_compressed);
    assert_eq!(entry.compressed_size, entry.raw_size);
    assert_eq!(ypf::extract_one(&packed.data, entry).unwrap(), noise);
}

#[test]
fn ypf_empty_file_rejected() {
    let source = TempDir::new().unwrap();
    write_file(source.path(), "ok.txt", b"ok");
    write_file(source.path(), "empty.txt", b"");

    match ypf::pack(source.path(), 500, 932) {
        Err(YpfError::EmptyFile(path)) => assert!(path.ends_with("empty.txt")),
        other => panic!("expected EmptyFile, got {other:?}"),
    }
}

#[test]
fn ypf_long_name_rejected() {
    let source = TempDir::new().unwrap();
    // 200 + separator + 51 + ".txt" = 256 encoded bytes
    let name = format!("{}/{}.txt", "d".repeat(200), "n".repeat(51));
    write_file(source.path(), &name, b"x");

    let err = ypf::pack(source.path(), 500, 932).unwrap_err();
    assert!(matches!(err, YpfError::FilenameTooLong { length: 256, .. }));
    assert!(err.is_pack_input_error());
}

#[test]
fn ypf_name_checksum_corruption_detected() {
    let mut builder = YpfBuilder::new(PackOptions::default());
    builder.add_file("a.txt", b"hi".to_vec()).unwrap();
    let mut data = builder.build().unwrap().data;

    // Header (32) + name checksum (4) + length byte (1), then the stored name
    data[37] ^= 0x01;
    let err = ypf::parse(&data, Codepage::default()).unwrap_err();
    assert!(matches!(err, YpfError::NameChecksumMismatch { .. }));
    assert!(err.is_integrity_error());
}

#[test]
fn ypf_data_corruption_is_reported_but_extracted() {
    let mut builder = YpfBuilder::new(PackOptions::default());
    builder.add_file("a.txt", b"hi".to_vec()).unwrap();
    let mut data = builder.build().unwrap().data;
    let last = data.len() - 1;
    data[last] = b'!';

    let archive = YpfArchive::from_bytes(data, Codepage::default()).unwrap();
    let dest = TempDir::new().unwrap();
    archive.extract_all(dest.path()).unwrap();
    assert_eq!(fs::read(dest.path().join("a.txt")).unwrap(), b"h!");

    let report = archive.verify().unwrap();
    assert_eq!(report.checksum_mismatches.len(), 1);
}

#[test]
fn ypf_unsafe_names_not_extracted() {
    let mut builder = YpfBuilder::new(PackOptions::default());
    builder.add_file("..\\escape.txt", b"nope".to_vec()).unwrap();
    let packed = builder.build().unwrap();

    let outer = TempDir::new().unwrap();
    let dest = outer.path().join("out");
    let err = ypf::extract_all(&packed.data, &packed.entries, &dest).unwrap_err();
    assert!(matches!(err, YpfError::UnsafePath(_)));
    assert!(!outer.path().join("escape.txt").exists());
}

#[test]
fn ypf_pack_to_file_writes_archive() {
    let source = sample_tree();
    let outer = TempDir::new().unwrap();
    let output = outer.path().join("nested").join("data.ypf");

    let packed = ypf::pack_to_file(source.path(), &output, PackOptions::default()).unwrap();
    assert_eq!(fs::read(&output).unwrap(), packed.data);
    assert_eq!(packed.shared_payloads, 1);

    let archive = YpfArchive::open(&output, Codepage::default()).unwrap();
    assert_eq!(archive.entries().len(), 6);
}

#[test]
fn ypf_pack_to_file_leaves_nothing_on_failure() {
    let source = TempDir::new().unwrap();
    write_file(source.path(), "empty.txt", b"");
    let outer = TempDir::new().unwrap();
    let output: PathBuf = outer.path().join("data.ypf");

    assert!(ypf::pack_to_file(source.path(), &output, PackOptions::default()).is_err());
    assert!(!output.exists());
    assert_eq!(fs::read_dir(outer.path()).unwrap().count(), 0);
}

#[test]
fn ypf_checksum_collisions_keep_their_own_bytes() {
    // "abc" and "b`d" share length and Adler-32
    let source = TempDir::new().unwrap();
    write_file(source.path(), "x.txt", b"abc");
    write_file(source.path(), "y.txt", b"b`d");

    let data = ypf::pack(source.path(), 290, 932).unwrap();
    let info = ypf::parse(&data, Codepage::default()).unwrap();
    assert_eq!(info.unique_payloads(), 2);

    let dest = TempDir::new().unwrap();
    ypf::extract_all(&data, &info.entries, dest.path()).unwrap();
    assert_eq!(read_tree(dest.path()), read_tree(source.path()));
}

#[test]
fn ypf_names_equal_after_encoding_rejected() {
    // Both names become "?.txt" in Shift-JIS
    let source = TempDir::new().unwrap();
    write_file(source.path(), "\u{e9}.txt", b"first");
    write_file(source.path(), "\u{fc}.txt", b"second");

    let err = ypf::pack(source.path(), 500, 932).unwrap_err();
    assert!(matches!(err, YpfError::DuplicateFilename(_)));
    assert!(err.is_pack_input_error());
}

#[test]
fn ypf_custom_separator() {
    let source = TempDir::new().unwrap();
    write_file(source.path(), "bg/title.png", b"png");

    let options = PackOptions {
        separator: '/',
        ..PackOptions::default()
    };
    let data = ypf::pack_with_options(source.path(), options).unwrap();
    let info = ypf::parse(&data, Codepage::default()).unwrap();
    assert_eq!(info.entries[0].name, "bg/title.png");
}

mod proptest_tests {
    use super::*;
    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    fn version() -> impl Strategy<Value = u32> {
        prop_oneof![Just(290u32), Just(300), Just(478), Just(479), Just(500), Just(501)]
    }

    fn files() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
        prop::collection::btree_map(
            "[a-z]{1,8}(\\\\[a-z]{1,8}){0,2}\\.(txt|png|ogg|ybn)",
            prop::collection::vec(any::<u8>(), 1..512),
            1..12,
        )
        .prop_map(|map| map.into_iter().collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Every packed file extracts to its original bytes
        #[test]
        fn packed_files_extract_unchanged(version in version(), files in files()) {
            let mut builder = YpfBuilder::new(PackOptions::new(version, Codepage::default()));
            for (name, data) in &files {
                builder
                    .add_file(name.clone(), data.clone())
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
            }
            let packed = builder.build().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let info = ypf::parse(&packed.data, Codepage::default())
                .map_err(|e| TestCaseError::fail(e.to_string()))?;

            prop_assert_eq!(info.entries.len(), files.len());
            for (name, data) in &files {
                let entry = info.find(name).ok_or_else(|| TestCaseError::fail(name.clone()))?;
                let extracted = ypf::extract_one(&packed.data, entry)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(&extracted, data);
            }
        }
    }
}
