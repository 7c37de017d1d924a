//! Document container subsystem
//!
//! A container is a flat binary file of documents stored back to back, each
//! a key plus a possibly-compressed payload. This module owns the record
//! framing, the compression dispatch and the scanner built on both.
//!
//! # Design Principles
//!
//! - Self-describing records (fixed size prefixes, no index)
//! - One compression type per container, supplied by the caller
//! - Tombstones are records: a key with a negative payload size
//! - Corruption is never resynchronised past; it fails the operation
//! - Single-threaded, blocking I/O; one file handle per scanner

mod compression;
mod errors;
mod reader;
mod record;
mod writer;

pub use compression::{compress, decompress, materialize, CompressionType};
pub use errors::{ContainerError, ContainerResult};
pub use reader::{ContainerScanner, ScannerConfig};
pub use record::{
    Document, RecordDescriptor, RecordReader, DEFAULT_KEY_SIZE_LIMIT, EMPTY_DOC_KEY,
    SIZE_FIELD_LEN, TOMBSTONE_PAYLOAD_SIZE,
};
pub use writer::DocWriter;
