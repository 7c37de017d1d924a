//! Container error types
//!
//! Error codes:
//! - DOCBIN_INVALID_RECORD - key size out of bounds or undecodable key
//! - DOCBIN_TRUNCATED_RECORD - frame declares more bytes than the stream holds
//! - DOCBIN_UNSUPPORTED_COMPRESSION - tag has no decoding strategy
//! - DOCBIN_DECOMPRESSION_FAILED - payload does not match the declared codec
//! - DOCBIN_NOT_FOUND - container file cannot be opened
//! - DOCBIN_IO_ERROR - any other read/write failure
//!
//! None of these are retried. An operation either yields a complete result
//! or fails with exactly one of them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::compression::CompressionType;

/// Result type for container operations
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors raised by the record codec, decompression dispatch and scanner.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("invalid record at byte offset {offset}: {reason}")]
    InvalidRecord { offset: u64, reason: String },

    #[error("truncated record at byte offset {offset}: {reason}")]
    TruncatedRecord { offset: u64, reason: String },

    #[error("compression type '{0}' has no decoding strategy")]
    UnsupportedCompression(CompressionType),

    #[error("failed to decompress document '{key}': {source}")]
    DecompressionFailed {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("container not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl ContainerError {
    pub fn invalid_record(offset: u64, reason: impl Into<String>) -> Self {
        ContainerError::InvalidRecord {
            offset,
            reason: reason.into(),
        }
    }

    pub fn truncated_record(offset: u64, reason: impl Into<String>) -> Self {
        ContainerError::TruncatedRecord {
            offset,
            reason: reason.into(),
        }
    }

    pub fn decompression_failed(key: impl Into<String>, source: io::Error) -> Self {
        ContainerError::DecompressionFailed {
            key: key.into(),
            source,
        }
    }

    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ContainerError::Io {
            context: context.into(),
            source,
        }
    }

    /// Returns the stable string code for this error
    pub fn code(&self) -> &'static str {
        match self {
            ContainerError::InvalidRecord { .. } => "DOCBIN_INVALID_RECORD",
            ContainerError::TruncatedRecord { .. } => "DOCBIN_TRUNCATED_RECORD",
            ContainerError::UnsupportedCompression(_) => "DOCBIN_UNSUPPORTED_COMPRESSION",
            ContainerError::DecompressionFailed { .. } => "DOCBIN_DECOMPRESSION_FAILED",
            ContainerError::NotFound { .. } => "DOCBIN_NOT_FOUND",
            ContainerError::Io { .. } => "DOCBIN_IO_ERROR",
        }
    }

    /// Returns whether this error signals a corrupt or misaligned container.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            ContainerError::InvalidRecord { .. } | ContainerError::TruncatedRecord { .. }
        )
    }

    /// Byte offset of the failing record, for framing errors.
    pub fn offset(&self) -> Option<u64> {
        match self {
            ContainerError::InvalidRecord { offset, .. }
            | ContainerError::TruncatedRecord { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}
