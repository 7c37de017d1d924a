//! Decompression dispatch
//!
//! The container format carries no compression marker. A single
//! [`CompressionType`] is supplied by the caller for the whole file and is
//! resolved here to a decoding strategy:
//!
//! | tag    | value | names            | strategy              |
//! |--------|-------|------------------|-----------------------|
//! | GZIP   | 0     | `gzip`           | gzip (multi-member)   |
//! | NONE   | 1     | `none`           | never dispatched      |
//! | ZIP    | 2     | `zip`            | unsupported           |
//! | BZIP2  | 3     | `bzip2`, `bz2`   | bzip2 (multi-stream)  |
//! | BROTLI | 4     | `br`, `brotli`   | unsupported           |
//! | LZ4    | 5     | `lz4`            | unsupported           |
//!
//! The empty-document sentinel is checked in [`materialize`] before any
//! strategy runs, so every strategy sees only real payloads.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;

use bzip2::read::MultiBzDecoder;
use bzip2::write::BzEncoder;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use super::errors::{ContainerError, ContainerResult};
use super::record::{Document, EMPTY_DOC_KEY};

/// A payload transformation: raw bytes in, transformed bytes out.
type Codec = fn(&[u8]) -> io::Result<Vec<u8>>;

/// Compression family of a whole container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum CompressionType {
    #[default]
    Gzip = 0,
    /// Payloads are stored as final text
    None = 1,
    Zip = 2,
    #[serde(alias = "bz2")]
    Bzip2 = 3,
    #[serde(alias = "br")]
    Brotli = 4,
    Lz4 = 5,
}

impl CompressionType {
    /// Every tag, in tag order.
    pub const ALL: [CompressionType; 6] = [
        CompressionType::Gzip,
        CompressionType::None,
        CompressionType::Zip,
        CompressionType::Bzip2,
        CompressionType::Brotli,
        CompressionType::Lz4,
    ];

    /// Name -> tag table, aliases included.
    pub const NAMES: [(&'static str, CompressionType); 8] = [
        ("gzip", CompressionType::Gzip),
        ("none", CompressionType::None),
        ("zip", CompressionType::Zip),
        ("bzip2", CompressionType::Bzip2),
        ("bz2", CompressionType::Bzip2),
        ("br", CompressionType::Brotli),
        ("brotli", CompressionType::Brotli),
        ("lz4", CompressionType::Lz4),
    ];

    /// Returns the integer tag
    pub fn tag(self) -> i32 {
        self as i32
    }

    /// Resolves an integer tag
    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.tag() == tag)
    }

    /// Resolves a compression name, aliases included
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, c)| *c)
    }

    /// Returns the canonical name
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::Gzip => "gzip",
            CompressionType::None => "none",
            CompressionType::Zip => "zip",
            CompressionType::Bzip2 => "bzip2",
            CompressionType::Brotli => "brotli",
            CompressionType::Lz4 => "lz4",
        }
    }

    /// Returns whether payloads under this tag need a decoding step at all.
    pub fn is_passthrough(self) -> bool {
        self == CompressionType::None
    }

    /// Returns whether a decoding strategy exists for this tag.
    pub fn is_supported(self) -> bool {
        self.decoder().is_some()
    }

    fn decoder(self) -> Option<Codec> {
        match self {
            CompressionType::Gzip => Some(gzip_decode),
            CompressionType::Bzip2 => Some(bzip2_decode),
            CompressionType::None
            | CompressionType::Zip
            | CompressionType::Brotli
            | CompressionType::Lz4 => None,
        }
    }

    fn encoder(self) -> Option<Codec> {
        match self {
            CompressionType::Gzip => Some(gzip_encode),
            CompressionType::Bzip2 => Some(bzip2_encode),
            CompressionType::None
            | CompressionType::Zip
            | CompressionType::Brotli
            | CompressionType::Lz4 => None,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CompressionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| {
            let names: Vec<&str> = Self::NAMES.iter().map(|(n, _)| *n).collect();
            format!(
                "unknown compression type '{}', expected one of: {}",
                s,
                names.join(", ")
            )
        })
    }
}

fn gzip_decode(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    MultiGzDecoder::new(payload).read_to_end(&mut out)?;
    Ok(out)
}

fn bzip2_decode(payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::new();
    MultiBzDecoder::new(payload).read_to_end(&mut out)?;
    Ok(out)
}

fn gzip_encode(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

fn bzip2_encode(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Decodes a raw payload with the strategy for `compression`.
///
/// NONE has no strategy here: callers treat NONE payloads as final text and
/// must not dispatch them.
pub fn decompress(compression: CompressionType, payload: &[u8]) -> ContainerResult<Vec<u8>> {
    dispatch(compression, payload, "")
}

/// Encodes `data` with the strategy for `compression`.
pub fn compress(compression: CompressionType, data: &[u8]) -> ContainerResult<Vec<u8>> {
    let encoder = compression
        .encoder()
        .ok_or(ContainerError::UnsupportedCompression(compression))?;
    encoder(data).map_err(|e| ContainerError::io(format!("{} encoding failed", compression), e))
}

/// Produces `document.content` from its raw payload.
///
/// The empty-document sentinel short-circuits before any strategy runs.
/// On failure `content` is left untouched.
pub fn materialize(document: &mut Document) -> ContainerResult<()> {
    if document.is_empty_doc() {
        document.content = Some(EMPTY_DOC_KEY.to_string());
        return Ok(());
    }

    if !document.compression.is_supported() {
        return Err(ContainerError::UnsupportedCompression(document.compression));
    }
    let payload = document.raw_payload.as_deref().ok_or_else(|| {
        ContainerError::decompression_failed(
            document.key.as_str(),
            io::Error::new(io::ErrorKind::InvalidInput, "tombstone carries no payload"),
        )
    })?;
    let bytes = dispatch(document.compression, payload, &document.key)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        ContainerError::decompression_failed(
            document.key.as_str(),
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })?;

    document.content = Some(text);
    Ok(())
}

fn dispatch(compression: CompressionType, payload: &[u8], key: &str) -> ContainerResult<Vec<u8>> {
    let decoder = compression
        .decoder()
        .ok_or(ContainerError::UnsupportedCompression(compression))?;
    decoder(payload).map_err(|e| ContainerError::decompression_failed(key, e))
}
