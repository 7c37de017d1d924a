//! Container scanner: point reads, counts and filtered listings
//!
//! A scanner binds one container file and one compression type for the whole
//! file. Every operation starts from an absolute byte offset that must sit on
//! a record boundary; no resynchronisation is attempted, so a misaligned
//! offset surfaces as `InvalidRecord` or `TruncatedRecord`.
//!
//! End of file exactly at a record boundary ends a scan successfully. Any
//! other failure aborts the operation and is returned once, unretried.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use super::compression::{self, CompressionType};
use super::errors::{ContainerError, ContainerResult};
use super::record::{Document, RecordDescriptor, RecordReader, DEFAULT_KEY_SIZE_LIMIT};
use crate::observability::{log_event_with_fields, Event};

/// Scanner tuning shared by every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannerConfig {
    /// Upper bound for a record's key size
    pub key_size_limit: i32,
    /// Whether tombstones are counted and listed
    pub include_tombstones: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            key_size_limit: DEFAULT_KEY_SIZE_LIMIT,
            include_tombstones: true,
        }
    }
}

/// Sequential and positional reader over one container file.
///
/// Owns its file handle exclusively; the handle is closed when the scanner
/// is dropped.
pub struct ContainerScanner {
    /// Path to the container file
    path: PathBuf,
    /// Record decoder over the buffered file
    reader: RecordReader<BufReader<File>>,
    /// Compression of every payload in the file
    compression: CompressionType,
    config: ScannerConfig,
    /// File size at open time
    file_size: u64,
}

impl ContainerScanner {
    /// Opens a container with the default configuration.
    pub fn open(path: &Path, compression: CompressionType) -> ContainerResult<Self> {
        Self::open_with_config(path, compression, ScannerConfig::default())
    }

    /// Opens a container for reading.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the file does not exist and `Io` for any other
    /// open failure.
    pub fn open_with_config(
        path: &Path,
        compression: CompressionType,
        config: ScannerConfig,
    ) -> ContainerResult<Self> {
        let file = File::open(path).map_err(|e| {
            let path_str = path.display().to_string();
            let reason = e.to_string();
            log_event_with_fields(
                Event::ContainerOpenFailed,
                &[("path", path_str.as_str()), ("reason", reason.as_str())],
            );
            if e.kind() == io::ErrorKind::NotFound {
                ContainerError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                ContainerError::io(format!("failed to open container {}", path_str), e)
            }
        })?;

        let file_size = file
            .metadata()
            .map_err(|e| ContainerError::io("failed to read container metadata", e))?
            .len();

        let size_str = file_size.to_string();
        let path_str = path.display().to_string();
        log_event_with_fields(
            Event::ContainerOpened,
            &[
                ("compression", compression.name()),
                ("file_size", size_str.as_str()),
                ("path", path_str.as_str()),
            ],
        );

        Ok(Self {
            path: path.to_path_buf(),
            reader: RecordReader::new(BufReader::new(file))
                .with_key_size_limit(config.key_size_limit),
            compression,
            config,
            file_size,
        })
    }

    /// Returns the container file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn compression(&self) -> CompressionType {
        self.compression
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.config
    }

    /// Returns the container size in bytes, as seen at open time.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Reads the single record starting at `offset`.
    ///
    /// With `decompress`, content is materialized unless the container is
    /// NONE (payloads are already text) or the record is a tombstone.
    pub fn read_at(&mut self, offset: u64, decompress: bool) -> ContainerResult<Document> {
        let result = self.read_at_inner(offset, decompress);
        self.observe(result)
    }

    fn read_at_inner(&mut self, offset: u64, decompress: bool) -> ContainerResult<Document> {
        self.reader.seek_to(offset)?;
        let mut document = self.reader.read_document()?;
        document.compression = self.compression;
        self.trace_record(offset, &document.key);

        if decompress {
            self.materialize(&mut document)?;
        }
        Ok(document)
    }

    /// Counts records from `offset` to end of file without reading payloads.
    pub fn count(&mut self, offset: u64) -> ContainerResult<u64> {
        let result = self.count_inner(offset);
        self.observe(result)
    }

    fn count_inner(&mut self, offset: u64) -> ContainerResult<u64> {
        self.scan_start("count", offset);
        self.reader.seek_to(offset)?;

        let mut count = 0u64;
        while let Some(descriptor) = self.reader.next_descriptor()? {
            self.reader.skip_payload(&descriptor, self.file_size)?;
            if self.config.include_tombstones || !descriptor.is_tombstone() {
                count += 1;
            }
        }

        self.scan_complete("count", count);
        Ok(count)
    }

    /// Emits every record from `offset` as `(record_offset, document)`.
    ///
    /// Returns the number of emitted documents.
    pub fn list<F>(&mut self, offset: u64, decompress: bool, emit: F) -> ContainerResult<u64>
    where
        F: FnMut(u64, Document),
    {
        self.list_matching(offset, |_| true, decompress, emit)
    }

    /// Emits the records from `offset` whose descriptor satisfies `predicate`.
    ///
    /// The predicate sees only the frame header; payloads of rejected records
    /// are skipped without being read or decompressed.
    pub fn list_matching<P, F>(
        &mut self,
        offset: u64,
        predicate: P,
        decompress: bool,
        emit: F,
    ) -> ContainerResult<u64>
    where
        P: FnMut(&RecordDescriptor) -> bool,
        F: FnMut(u64, Document),
    {
        let result = self.list_inner(offset, predicate, decompress, emit);
        self.observe(result)
    }

    fn list_inner<P, F>(
        &mut self,
        offset: u64,
        mut predicate: P,
        decompress: bool,
        mut emit: F,
    ) -> ContainerResult<u64>
    where
        P: FnMut(&RecordDescriptor) -> bool,
        F: FnMut(u64, Document),
    {
        self.scan_start("list", offset);
        self.reader.seek_to(offset)?;

        let mut emitted = 0u64;
        loop {
            let record_offset = self.reader.position();
            let descriptor = match self.reader.next_descriptor()? {
                Some(descriptor) => descriptor,
                None => break,
            };

            let wanted = (self.config.include_tombstones || !descriptor.is_tombstone())
                && predicate(&descriptor);
            if !wanted {
                self.reader.skip_payload(&descriptor, self.file_size)?;
                continue;
            }

            let raw_payload = self.reader.read_payload(&descriptor)?;
            self.trace_record(record_offset, &descriptor.key);
            let mut document = Document {
                key: descriptor.key,
                raw_payload,
                content: None,
                compression: self.compression,
            };
            if decompress {
                self.materialize(&mut document)?;
            }

            emit(record_offset, document);
            emitted += 1;
        }

        self.scan_complete("list", emitted);
        Ok(emitted)
    }

    /// Collects the matching documents from `offset` into a vector.
    pub fn collect<P>(
        &mut self,
        offset: u64,
        predicate: P,
        decompress: bool,
    ) -> ContainerResult<Vec<Document>>
    where
        P: FnMut(&RecordDescriptor) -> bool,
    {
        let mut documents = Vec::new();
        self.list_matching(offset, predicate, decompress, |_, document| {
            documents.push(document)
        })?;
        Ok(documents)
    }

    /// NONE containers and tombstones are never dispatched. The sentinel
    /// guard lives in `compression::materialize`.
    fn materialize(&self, document: &mut Document) -> ContainerResult<()> {
        if self.compression.is_passthrough() {
            return Ok(());
        }
        if document.is_tombstone() && !document.is_empty_doc() {
            return Ok(());
        }
        compression::materialize(document)
    }

    fn observe<T>(&self, result: ContainerResult<T>) -> ContainerResult<T> {
        if let Err(ref err) = result {
            let event = match err {
                ContainerError::InvalidRecord { .. } | ContainerError::TruncatedRecord { .. } => {
                    Some(Event::CorruptionDetected)
                }
                ContainerError::DecompressionFailed { .. }
                | ContainerError::UnsupportedCompression(_) => Some(Event::DecompressionFailed),
                _ => None,
            };
            if let Some(event) = event {
                let path_str = self.path.display().to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    event,
                    &[
                        ("code", err.code()),
                        ("path", path_str.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
            }
        }
        result
    }

    fn trace_record(&self, offset: u64, key: &str) {
        let key_size = key.len().to_string();
        let offset = offset.to_string();
        log_event_with_fields(
            Event::RecordRead,
            &[
                ("key", key),
                ("key_size", key_size.as_str()),
                ("offset", offset.as_str()),
            ],
        );
    }

    fn scan_start(&self, operation: &str, offset: u64) {
        let offset = offset.to_string();
        log_event_with_fields(
            Event::ScanStart,
            &[("offset", offset.as_str()), ("operation", operation)],
        );
    }

    fn scan_complete(&self, operation: &str, records: u64) {
        let records = records.to_string();
        log_event_with_fields(
            Event::ScanComplete,
            &[("operation", operation), ("records", records.as_str())],
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::writer::DocWriter;
    use super::*;
    use tempfile::TempDir;

    /// Writes `documents` to a fresh container, returning its path and the
    /// offset of every record.
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

    fn gzip_doc(key: &str, content: &str) -> Document {
        Document::compressed(key, content, CompressionType::Gzip).unwrap()
    }

    #[test]
    fn test_open_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = ContainerScanner::open(&temp_dir.path().join("nope.bin"), CompressionType::Gzip);
        assert!(matches!(result, Err(ContainerError::NotFound { .. })));
    }

    #[test]
    fn test_empty_container() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _) = write_container(&temp_dir, &[]);

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        assert_eq!(scanner.file_size(), 0);
        assert_eq!(scanner.count(0).unwrap(), 0);
        assert!(scanner.collect(0, |_| true, true).unwrap().is_empty());
        assert!(matches!(
            scanner.read_at(0, false),
            Err(ContainerError::TruncatedRecord { .. })
        ));
    }

    #[test]
    fn test_read_at_offsets() {
        let temp_dir = TempDir::new().unwrap();
        let (path, offsets) = write_container(
            &temp_dir,
            &[gzip_doc("doc1", "first"), gzip_doc("doc2", "second")],
        );

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        let doc = scanner.read_at(offsets[1], true).unwrap();
        assert_eq!(doc.key, "doc2");
        assert_eq!(doc.content.as_deref(), Some("second"));
        assert_eq!(doc.compression, CompressionType::Gzip);

        let raw = scanner.read_at(offsets[0], false).unwrap();
        assert_eq!(raw.key, "doc1");
        assert!(raw.content.is_none());
        assert!(raw.raw_payload.is_some());
    }

    #[test]
    fn test_misaligned_offset_fails() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _) = write_container(&temp_dir, &[gzip_doc("doc1", "first")]);

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        let err = scanner.read_at(1, false).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_count_from_offset() {
        let temp_dir = TempDir::new().unwrap();
        let (path, offsets) = write_container(
            &temp_dir,
            &[
                gzip_doc("a", "1"),
                gzip_doc("b", "2"),
                Document::tombstone("c"),
            ],
        );

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        assert_eq!(scanner.count(0).unwrap(), 3);
        assert_eq!(scanner.count(offsets[1]).unwrap(), 2);
        assert_eq!(scanner.count(scanner.file_size()).unwrap(), 0);
    }

    #[test]
    fn test_tombstones_can_be_excluded() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _) = write_container(
            &temp_dir,
            &[gzip_doc("a", "1"), Document::tombstone("b")],
        );

        let config = ScannerConfig {
            include_tombstones: false,
            ..ScannerConfig::default()
        };
        let mut scanner =
            ContainerScanner::open_with_config(&path, CompressionType::Gzip, config).unwrap();
        assert_eq!(scanner.count(0).unwrap(), 1);

        let keys: Vec<String> = scanner
            .collect(0, |_| true, false)
            .unwrap()
            .into_iter()
            .map(|d| d.key)
            .collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_list_reports_offsets() {
        let temp_dir = TempDir::new().unwrap();
        let (path, offsets) = write_container(
            &temp_dir,
            &[gzip_doc("a", "1"), gzip_doc("b", "2"), gzip_doc("c", "3")],
        );

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        let mut seen = Vec::new();
        let emitted = scanner
            .list(0, false, |offset, doc| seen.push((offset, doc.key)))
            .unwrap();

        assert_eq!(emitted, 3);
        let seen_offsets: Vec<u64> = seen.iter().map(|(o, _)| *o).collect();
        assert_eq!(seen_offsets, offsets);
    }

    #[test]
    fn test_predicate_skips_decompression() {
        let temp_dir = TempDir::new().unwrap();
        // "bad" is not valid gzip; filtering it out must avoid decoding it
        let (path, _) = write_container(
            &temp_dir,
            &[
                Document::new("bad", b"not gzip".to_vec()),
                gzip_doc("good", "fine"),
            ],
        );

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        let docs = scanner.collect(0, |d| d.key == "good", true).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content.as_deref(), Some("fine"));

        let err = scanner.collect(0, |_| true, true).unwrap_err();
        assert!(matches!(err, ContainerError::DecompressionFailed { .. }));
    }

    #[test]
    fn test_none_compression_never_dispatches() {
        let temp_dir = TempDir::new().unwrap();
        let (path, offsets) = write_container(
            &temp_dir,
            &[Document::new("plain", b"already text".to_vec())],
        );

        let mut scanner = ContainerScanner::open(&path, CompressionType::None).unwrap();
        let doc = scanner.read_at(offsets[0], true).unwrap();
        assert!(doc.content.is_none());
        assert_eq!(doc.text().as_deref(), Some("already text"));
    }

    #[test]
    fn test_unsupported_compression_surfaces() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _) = write_container(&temp_dir, &[Document::new("a", b"x".to_vec())]);

        let mut scanner = ContainerScanner::open(&path, CompressionType::Lz4).unwrap();
        let err = scanner.read_at(0, true).unwrap_err();
        assert!(matches!(
            err,
            ContainerError::UnsupportedCompression(CompressionType::Lz4)
        ));
        // Without decompression the record is still readable
        assert_eq!(scanner.read_at(0, false).unwrap().key, "a");
    }

    #[test]
    fn test_bzip2_container() {
        let temp_dir = TempDir::new().unwrap();
        let doc = Document::compressed("b", "block sorted", CompressionType::Bzip2).unwrap();
        let (path, _) = write_container(&temp_dir, &[doc]);

        let mut scanner = ContainerScanner::open(&path, CompressionType::Bzip2).unwrap();
        let doc = scanner.read_at(0, true).unwrap();
        assert_eq!(doc.content.as_deref(), Some("block sorted"));
    }

    #[test]
    fn test_payload_past_end_fails_count() {
        let temp_dir = TempDir::new().unwrap();
        let (path, _) = write_container(&temp_dir, &[gzip_doc("a", "hello")]);

        let mut bytes = std::fs::read(&path).unwrap();
        bytes.pop();
        std::fs::write(&path, bytes).unwrap();

        let mut scanner = ContainerScanner::open(&path, CompressionType::Gzip).unwrap();
        assert!(matches!(
            scanner.count(0),
            Err(ContainerError::TruncatedRecord { offset: 0, .. })
        ));
    }
}
