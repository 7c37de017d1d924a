//! Single-record writer
//!
//! Encodes documents onto any byte sink in container framing. There is no
//! append coordination: callers own the sink and its lifetime.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::errors::{ContainerError, ContainerResult};
use super::record::{Document, DEFAULT_KEY_SIZE_LIMIT};

/// Writes documents in container framing, tracking the sink offset.
pub struct DocWriter<W: Write> {
    inner: W,
    /// Offset of the next record
    position: u64,
    key_size_limit: i32,
}

impl DocWriter<BufWriter<File>> {
    /// Creates (or truncates) a container file at `path`.
    pub fn create(path: &Path) -> ContainerResult<Self> {
        let file = File::create(path).map_err(|e| {
            ContainerError::io(format!("failed to create container {}", path.display()), e)
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }

    /// Flushes buffered records and fsyncs the file.
    pub fn sync(&mut self) -> ContainerResult<()> {
        self.flush()?;
        self.inner
            .get_ref()
            .sync_all()
            .map_err(|e| ContainerError::io("fsync failed", e))
    }
}

impl<W: Write> DocWriter<W> {
    pub fn new(inner: W) -> Self {
        Self::with_position(inner, 0)
    }

    /// Wraps a sink whose next byte lands at `position`
    pub fn with_position(inner: W, position: u64) -> Self {
        Self {
            inner,
            position,
            key_size_limit: DEFAULT_KEY_SIZE_LIMIT,
        }
    }

    pub fn with_key_size_limit(mut self, key_size_limit: i32) -> Self {
        self.key_size_limit = key_size_limit;
        self
    }

    /// Returns the offset the next record will be written at.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Writes one record, returning the number of bytes written.
    ///
    /// A `None` document is a no-op that reports zero bytes.
    pub fn write(&mut self, document: Option<&Document>) -> ContainerResult<usize> {
        let document = match document {
            Some(document) => document,
            None => return Ok(0),
        };

        document
            .check_frame(self.key_size_limit)
            .map_err(|reason| ContainerError::invalid_record(self.position, reason))?;
        let encoded = document.encode(self.key_size_limit)?;

        self.inner.write_all(&encoded).map_err(|e| {
            ContainerError::io(format!("failed to write document '{}'", document.key), e)
        })?;
        self.position += encoded.len() as u64;

        Ok(encoded.len())
    }

    /// Writes one record, returning the offset it was written at.
    pub fn write_document(&mut self, document: &Document) -> ContainerResult<u64> {
        let offset = self.position;
        self.write(Some(document))?;
        Ok(offset)
    }

    pub fn flush(&mut self) -> ContainerResult<()> {
        self.inner
            .flush()
            .map_err(|e| ContainerError::io("failed to flush container", e))
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
