//! Container record types and codec
//!
//! A container is a flat sequence of records with no file header, footer or
//! checksum:
//!
//! ```text
//! +------------------+
//! | Key Size         | (i32 LE, 0 < size <= key size limit)
//! +------------------+
//! | Key              | (key size bytes, UTF-8)
//! +------------------+
//! | Payload Size     | (i32 LE, negative = tombstone)
//! +------------------+
//! | Payload          | (payload size bytes, absent for tombstones)
//! +------------------+
//! ```
//!
//! The fixed size prefixes make every record self-describing, so a scanner
//! can step over a payload without decoding it.

use std::borrow::Cow;
use std::io::{self, Read, Seek, SeekFrom};

use super::compression::{self, CompressionType};
use super::errors::{ContainerError, ContainerResult};

/// Default bound on the encoded key length.
pub const DEFAULT_KEY_SIZE_LIMIT: i32 = 100;

/// Reserved key for placeholder documents. Decompressing a document with this
/// key yields the key itself without touching the payload.
pub const EMPTY_DOC_KEY: &str = "empty-doc.";

/// Payload size written for tombstones.
pub const TOMBSTONE_PAYLOAD_SIZE: i32 = -1;

/// Width of each size prefix.
pub const SIZE_FIELD_LEN: u64 = 4;

/// One stored unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifying key
    pub key: String,
    /// Payload as stored on disk (`None` for tombstones)
    pub raw_payload: Option<Vec<u8>>,
    /// Decoded text, set only by a successful decompression or the sentinel
    pub content: Option<String>,
    /// Container-wide compression this document was read under
    pub compression: CompressionType,
}

impl Document {
    /// Create a live document from an already encoded payload
    pub fn new(key: impl Into<String>, raw_payload: Vec<u8>) -> Self {
        Self {
            key: key.into(),
            raw_payload: Some(raw_payload),
            content: None,
            compression: CompressionType::default(),
        }
    }

    /// Create a tombstone: a key with no payload
    pub fn tombstone(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            raw_payload: None,
            content: None,
            compression: CompressionType::default(),
        }
    }

    /// Create a placeholder document keyed by [`EMPTY_DOC_KEY`]
    pub fn empty_doc() -> Self {
        Self::new(EMPTY_DOC_KEY, Vec::new())
    }

    /// Create a live document by compressing `content` with `compression`.
    ///
    /// NONE stores the text bytes as they are.
    pub fn compressed(
        key: impl Into<String>,
        content: &str,
        compression: CompressionType,
    ) -> ContainerResult<Self> {
        let raw_payload = if compression.is_passthrough() {
            content.as_bytes().to_vec()
        } else {
            compression::compress(compression, content.as_bytes())?
        };
        Ok(Self::new(key, raw_payload).with_compression(compression))
    }

    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    pub fn is_tombstone(&self) -> bool {
        self.raw_payload.is_none()
    }

    /// Returns whether this is the empty-document sentinel
    pub fn is_empty_doc(&self) -> bool {
        self.key == EMPTY_DOC_KEY
    }

    /// Decodes the raw payload into `content`.
    pub fn decompress(&mut self) -> ContainerResult<()> {
        compression::materialize(self)
    }

    /// Best-effort text: decoded content if present, otherwise the raw
    /// payload read as UTF-8 (NONE containers store final text).
    pub fn text(&self) -> Option<Cow<'_, str>> {
        match (&self.content, &self.raw_payload) {
            (Some(content), _) => Some(Cow::Borrowed(content.as_str())),
            (None, Some(raw)) => Some(String::from_utf8_lossy(raw)),
            (None, None) => None,
        }
    }

    /// Summary of this document's frame
    pub fn descriptor(&self) -> RecordDescriptor {
        RecordDescriptor {
            key_size: self.key.len() as i32,
            payload_size: self
                .raw_payload
                .as_ref()
                .map_or(TOMBSTONE_PAYLOAD_SIZE, |p| p.len() as i32),
            key: self.key.clone(),
        }
    }

    /// Total bytes this document occupies once encoded
    pub fn encoded_len(&self) -> u64 {
        let payload_len = self.raw_payload.as_ref().map_or(0, |p| p.len() as u64);
        SIZE_FIELD_LEN * 2 + self.key.len() as u64 + payload_len
    }

    /// Checks that this document can be framed under `key_size_limit`.
    pub fn check_frame(&self, key_size_limit: i32) -> Result<(), String> {
        let key_len = self.key.len();
        if key_len == 0 {
            return Err("key must not be empty".to_string());
        }
        if key_len > key_size_limit.max(0) as usize {
            return Err(format!(
                "key size {} exceeds limit {}",
                key_len, key_size_limit
            ));
        }
        if let Some(payload) = &self.raw_payload {
            if payload.len() > i32::MAX as usize {
                return Err(format!(
                    "payload size {} does not fit a size field",
                    payload.len()
                ));
            }
        }
        Ok(())
    }

    /// Serialize the record to bytes.
    ///
    /// Format: key size, key, payload size (`-1` for tombstones), payload.
    pub fn encode(&self, key_size_limit: i32) -> ContainerResult<Vec<u8>> {
        self.check_frame(key_size_limit)
            .map_err(|reason| ContainerError::invalid_record(0, reason))?;

        let mut buf = Vec::with_capacity(self.encoded_len() as usize);
        buf.extend_from_slice(&(self.key.len() as i32).to_le_bytes());
        buf.extend_from_slice(self.key.as_bytes());
        match &self.raw_payload {
            Some(payload) => {
                buf.extend_from_slice(&(payload.len() as i32).to_le_bytes());
                buf.extend_from_slice(payload);
            }
            None => buf.extend_from_slice(&TOMBSTONE_PAYLOAD_SIZE.to_le_bytes()),
        }
        Ok(buf)
    }
}

/// Frame summary of a record, read without touching its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDescriptor {
    pub key_size: i32,
    /// Negative for tombstones
    pub payload_size: i32,
    pub key: String,
}

impl RecordDescriptor {
    pub fn is_tombstone(&self) -> bool {
        self.payload_size < 0
    }

    /// Payload bytes following the frame header (0 for tombstones)
    pub fn payload_len(&self) -> u64 {
        if self.is_tombstone() {
            0
        } else {
            self.payload_size as u64
        }
    }

    /// Total encoded record length
    pub fn record_len(&self) -> u64 {
        SIZE_FIELD_LEN * 2 + self.key_size as u64 + self.payload_len()
    }
}

/// Decodes records from a byte stream, tracking the absolute stream position.
///
/// Every decode allocates fresh key and payload buffers owned by the
/// returned value.
pub struct RecordReader<R> {
    inner: R,
    /// Absolute offset of the next unread byte
    position: u64,
    /// Offset where the record being decoded starts
    record_start: u64,
    key_size_limit: i32,
}

impl<R: Read> RecordReader<R> {
    /// Wraps a stream positioned at offset 0
    pub fn new(inner: R) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wraps a stream already positioned at `position`
    pub fn with_position(inner: R, position: u64) -> Self {
        Self {
            inner,
            position,
            record_start: position,
            key_size_limit: DEFAULT_KEY_SIZE_LIMIT,
        }
    }

    pub fn with_key_size_limit(mut self, key_size_limit: i32) -> Self {
        self.key_size_limit = key_size_limit;
        self
    }

    pub fn key_size_limit(&self) -> i32 {
        self.key_size_limit
    }

    /// Returns the absolute offset of the next unread byte
    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads until `buf` is full or the stream ends. Returns bytes read.
    fn fill(&mut self, buf: &mut [u8]) -> ContainerResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ContainerError::io(
                        format!("failed to read record at byte offset {}", self.record_start),
                        e,
                    ))
                }
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    /// Reads an i32 size field. `None` if the stream ended before its first
    /// byte; a partial field is a truncated record.
    fn read_size_field(&mut self, field: &str) -> ContainerResult<Option<i32>> {
        let mut buf = [0u8; 4];
        match self.fill(&mut buf)? {
            4 => Ok(Some(i32::from_le_bytes(buf))),
            0 => Ok(None),
            n => Err(ContainerError::truncated_record(
                self.record_start,
                format!("{} needs 4 bytes, only {} available", field, n),
            )),
        }
    }

    /// Decodes the frame header of the next record.
    ///
    /// Returns `Ok(None)` on a clean end of stream at a record boundary.
    /// For live records the stream is left positioned at the payload.
    pub fn next_descriptor(&mut self) -> ContainerResult<Option<RecordDescriptor>> {
        self.record_start = self.position;

        let key_size = match self.read_size_field("key size")? {
            Some(size) => size,
            None => return Ok(None),
        };
        if key_size <= 0 || key_size > self.key_size_limit {
            return Err(ContainerError::invalid_record(
                self.record_start,
                format!(
                    "key size {} outside 1..={}",
                    key_size, self.key_size_limit
                ),
            ));
        }

        let mut key_buf = vec![0u8; key_size as usize];
        let got = self.fill(&mut key_buf)?;
        if got != key_buf.len() {
            return Err(ContainerError::truncated_record(
                self.record_start,
                format!("key needs {} bytes, only {} available", key_size, got),
            ));
        }
        let key = String::from_utf8(key_buf).map_err(|e| {
            ContainerError::invalid_record(self.record_start, format!("key is not UTF-8: {}", e))
        })?;

        let payload_size = self.read_size_field("payload size")?.ok_or_else(|| {
            ContainerError::truncated_record(
                self.record_start,
                "payload size needs 4 bytes, only 0 available",
            )
        })?;

        Ok(Some(RecordDescriptor {
            key_size,
            payload_size,
            key,
        }))
    }

    /// Reads the payload announced by `descriptor`. Tombstones read nothing.
    pub fn read_payload(&mut self, descriptor: &RecordDescriptor) -> ContainerResult<Option<Vec<u8>>> {
        if descriptor.is_tombstone() {
            return Ok(None);
        }

        let record_start = self.record_start;
        let wanted = descriptor.payload_len();
        let mut payload = Vec::new();
        let got = (&mut self.inner)
            .take(wanted)
            .read_to_end(&mut payload)
            .map_err(|e| {
                ContainerError::io(
                    format!(
                        "failed to read payload of record at byte offset {}",
                        record_start
                    ),
                    e,
                )
            })?;
        self.position += got as u64;

        if got as u64 != wanted {
            return Err(ContainerError::truncated_record(
                record_start,
                format!("payload needs {} bytes, only {} available", wanted, got),
            ));
        }
        Ok(Some(payload))
    }

    /// Decodes the next full record, `Ok(None)` at a clean end of stream.
    pub fn next_document(&mut self) -> ContainerResult<Option<Document>> {
        let descriptor = match self.next_descriptor()? {
            Some(descriptor) => descriptor,
            None => return Ok(None),
        };
        let raw_payload = self.read_payload(&descriptor)?;
        Ok(Some(Document {
            key: descriptor.key,
            raw_payload,
            content: None,
            compression: CompressionType::default(),
        }))
    }

    /// Decodes exactly one record. End of stream is a truncated record.
    pub fn read_document(&mut self) -> ContainerResult<Document> {
        match self.next_document()? {
            Some(document) => Ok(document),
            None => Err(ContainerError::truncated_record(
                self.record_start,
                "no record at offset",
            )),
        }
    }
}

impl<R: Read + Seek> RecordReader<R> {
    /// Repositions the stream at an absolute offset.
    pub fn seek_to(&mut self, offset: u64) -> ContainerResult<()> {
        self.inner.seek(SeekFrom::Start(offset)).map_err(|e| {
            ContainerError::io(format!("failed to seek to byte offset {}", offset), e)
        })?;
        self.position = offset;
        self.record_start = offset;
        Ok(())
    }

    /// Steps over the payload announced by `descriptor` without reading it.
    ///
    /// `data_len` is the total stream length; a payload reaching past it is a
    /// truncated record.
    pub fn skip_payload(&mut self, descriptor: &RecordDescriptor, data_len: u64) -> ContainerResult<()> {
        let len = descriptor.payload_len();
        if len == 0 {
            return Ok(());
        }

        let available = data_len.saturating_sub(self.position);
        if len > available {
            return Err(ContainerError::truncated_record(
                self.record_start,
                format!("payload needs {} bytes, only {} available", len, available),
            ));
        }

        self.inner.seek(SeekFrom::Current(len as i64)).map_err(|e| {
            ContainerError::io(
                format!(
                    "failed to skip payload of record at byte offset {}",
                    self.record_start
                ),
                e,
            )
        })?;
        self.position += len;
        Ok(())
    }
}
