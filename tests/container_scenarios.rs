//! Container scanning scenarios
//!
//! End-to-end checks over real container files:
//! - point reads land on record boundaries only
//! - counts stop cleanly at end of file and fail on truncation
//! - filtered listings evaluate keys before any decompression

use std::fs;
use std::path::PathBuf;

use docbin::container::{
    CompressionType, ContainerError, ContainerScanner, DocWriter, Document, ScannerConfig,
    EMPTY_DOC_KEY,
};
use tempfile::TempDir;

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

/// Writes `documents` to `<dir>/docs.bin`, returning the path and each
/// record's offset.
fn write_container(dir: &TempDir, documents: &[Document]) -> (PathBuf, Vec<u64>) {
    let path = dir.path().join("docs.bin");
    let mut writer = DocWriter::create(&path).unwrap();
    let offsets = documents
        .iter()
        .map(|doc| writer.write_document(doc).unwrap())
        .collect();
    writer.sync().unwrap();
    (path, offsets)
}

/// `("a", gzip("hello"))` followed by tombstone `"b"`
fn hello_container(dir: &TempDir) -> (PathBuf, Vec<u64>) {
    write_container(
        dir,
        &[
            Document::compressed("a", "hello", CompressionType::Gzip).unwrap(),
            Document::tombstone("b"),
        ],
    )
}

// =============================================================================
// Scenario A: count and point read over a live record and a tombstone
// =============================================================================

#[test]
fn test_count_includes_tombstone() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    assert_eq!(scanner.count(0).unwrap(), 2);
}

#[test]
fn test_point_read_tombstone() {
    let temp_dir = create_temp_dir();
    let (path, offsets) = hello_container(&temp_dir);

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let doc = scanner.read_at(offsets[1], false).unwrap();
    assert_eq!(doc.key, "b");
    assert!(doc.raw_payload.is_none());

    // Requesting decompression on a tombstone is not an error either
    let doc = scanner.read_at(offsets[1], true).unwrap();
    assert_eq!(doc.key, "b");
    assert!(doc.content.is_none());
}

#[test]
fn test_tombstone_record_length() {
    let temp_dir = create_temp_dir();
    let (path, offsets) = hello_container(&temp_dir);

    // Tombstone occupies exactly 8 + key size bytes and ends the file
    let file_len = fs::metadata(&path).unwrap().len();
    assert_eq!(file_len - offsets[1], 8 + 1);
}

// =============================================================================
// Scenario B: key-filtered listing decodes only the matching record
// =============================================================================

#[test]
fn test_list_by_key_decodes_content() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let docs = scanner.collect(0, |d| d.key == "a", true).unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].key, "a");
    assert_eq!(docs[0].content.as_deref(), Some("hello"));
}

#[test]
fn test_list_without_predicate_emits_everything() {
    let temp_dir = create_temp_dir();
    let (path, offsets) = hello_container(&temp_dir);

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let mut seen = Vec::new();
    let emitted = scanner
        .list(0, false, |offset, doc| seen.push((offset, doc.key)))
        .unwrap();

    assert_eq!(emitted, 2);
    assert_eq!(
        seen,
        vec![(offsets[0], "a".to_string()), (offsets[1], "b".to_string())]
    );
}

// =============================================================================
// Scenario C: truncation is an error, never a short count
// =============================================================================

#[test]
fn test_truncated_container_fails_count() {
    let temp_dir = create_temp_dir();
    let (path, offsets) = hello_container(&temp_dir);

    let mut contents = fs::read(&path).unwrap();
    contents.pop();
    fs::write(&path, contents).unwrap();

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let err = scanner.count(0).unwrap_err();
    assert!(
        matches!(err, ContainerError::TruncatedRecord { .. }),
        "expected truncated record, got {:?}",
        err
    );
    assert_eq!(err.offset(), Some(offsets[1]));
}

#[test]
fn test_truncated_container_fails_list() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let mut contents = fs::read(&path).unwrap();
    contents.truncate(contents.len() - 3);
    fs::write(&path, contents).unwrap();

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let mut emitted = 0;
    let result = scanner.list(0, false, |_, _| emitted += 1);
    assert!(matches!(result, Err(ContainerError::TruncatedRecord { .. })));
    assert_eq!(emitted, 1);
}

#[test]
fn test_trailing_garbage_is_corruption() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let mut contents = fs::read(&path).unwrap();
    contents.extend_from_slice(&0i32.to_le_bytes());
    fs::write(&path, contents).unwrap();

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    assert!(matches!(
        scanner.count(0),
        Err(ContainerError::InvalidRecord { .. })
    ));
}

// =============================================================================
// Sentinel and compression coverage
// =============================================================================

#[test]
fn test_sentinel_never_decompresses() {
    let temp_dir = create_temp_dir();
    let (path, offsets) = write_container(
        &temp_dir,
        &[Document::new(EMPTY_DOC_KEY, b"\x00corrupt, not gzip\xff".to_vec())],
    );

    let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
    let doc = scanner.read_at(offsets[0], true).unwrap();
    assert_eq!(doc.content.as_deref(), Some(EMPTY_DOC_KEY));
}

#[test]
fn test_bzip2_container_roundtrip() {
    let temp_dir = create_temp_dir();
    let (path, _) = write_container(
        &temp_dir,
        &[
            Document::compressed("one", "first body", CompressionType::Bzip2).unwrap(),
            Document::compressed("two", "second body", CompressionType::Bzip2).unwrap(),
        ],
    );

    let mut scanner = ContainerScanner::open(&path, CompressionType::Bzip2).unwrap();
    let contents: Vec<String> = scanner
        .collect(0, |_| true, true)
        .unwrap()
        .into_iter()
        .filter_map(|d| d.content)
        .collect();
    assert_eq!(contents, vec!["first body", "second body"]);
}

#[test]
fn test_wrong_compression_for_bytes() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let mut scanner = ContainerScanner::open(&path, CompressionType::Bzip2).unwrap();
    let err = scanner.read_at(0, true).unwrap_err();
    assert!(matches!(err, ContainerError::DecompressionFailed { .. }));
}

#[test]
fn test_unsupported_compression_tags() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    for compression in [
        CompressionType::Zip,
        CompressionType::Brotli,
        CompressionType::Lz4,
    ] {
        let mut scanner = ContainerScanner::open(&path, compression).unwrap();
        let err = scanner.read_at(0, true).unwrap_err();
        assert!(matches!(err, ContainerError::UnsupportedCompression(c) if c == compression));
    }
}

#[test]
fn test_none_compression_bypasses_dispatch() {
    let temp_dir = create_temp_dir();
    let (path, _) = write_container(
        &temp_dir,
        &[Document::compressed("plain", "final text", CompressionType::None).unwrap()],
    );

    let mut scanner = ContainerScanner::open(&path, CompressionType::None).unwrap();
    let doc = scanner.read_at(0, true).unwrap();
    assert!(doc.content.is_none());
    assert_eq!(doc.raw_payload.as_deref(), Some(&b"final text"[..]));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_exclude_tombstones() {
    let temp_dir = create_temp_dir();
    let (path, _) = hello_container(&temp_dir);

    let config = ScannerConfig {
        include_tombstones: false,
        ..ScannerConfig::default()
    };
    let mut scanner =
        ContainerScanner::open_with_config(&path, CompressionType::Gzip, config).unwrap();
    assert_eq!(scanner.count(0).unwrap(), 1);
    assert_eq!(scanner.collect(0, |_| true, false).unwrap().len(), 1);
}

#[test]
fn test_smaller_key_limit_rejects_records() {
    let temp_dir = create_temp_dir();
    let (path, _) = write_container(
        &temp_dir,
        &[Document::compressed("a-long-key", "x", CompressionType::Gzip).unwrap()],
    );

    let config = ScannerConfig {
        key_size_limit: 4,
        ..ScannerConfig::default()
    };
    let mut scanner =
        ContainerScanner::open_with_config(&path, CompressionType::Gzip, config).unwrap();
    assert!(matches!(
        scanner.count(0),
        Err(ContainerError::InvalidRecord { .. })
    ));
}

#[test]
fn test_missing_container_is_not_found() {
    let temp_dir = create_temp_dir();
    let err = ContainerScanner::open(&temp_dir.path().join("absent.bin"), CompressionType::Gzip)
        .err()
        .unwrap();
    assert!(matches!(err, ContainerError::NotFound { .. }));
    assert_eq!(err.code(), "DOCBIN_NOT_FOUND");
}
