//! Observable events
//!
//! Events are explicit and typed; each carries a fixed severity.

use std::fmt;

use super::logger::Severity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration file loaded
    ConfigLoaded,

    // Container lifecycle
    /// Container file opened for reading
    ContainerOpened,
    /// Container file could not be opened
    ContainerOpenFailed,

    // Scanning
    /// Sequential scan begins
    ScanStart,
    /// Sequential scan reached end of file
    ScanComplete,
    /// One record decoded
    RecordRead,

    // Failures
    /// Framing violation (bad key size, truncated record)
    CorruptionDetected,
    /// Payload could not be decoded
    DecompressionFailed,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ContainerOpened => "CONTAINER_OPENED",
            Event::ContainerOpenFailed => "CONTAINER_OPEN_FAILED",
            Event::ScanStart => "SCAN_BEGIN",
            Event::ScanComplete => "SCAN_COMPLETE",
            Event::RecordRead => "RECORD_READ",
            Event::CorruptionDetected => "CONTAINER_CORRUPTION",
            Event::DecompressionFailed => "DECOMPRESSION_FAILED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecordRead | Event::ScanStart | Event::ScanComplete => Severity::Trace,
            Event::ConfigLoaded | Event::ContainerOpened => Severity::Info,
            Event::ContainerOpenFailed
            | Event::CorruptionDetected
            | Event::DecompressionFailed => Severity::Warn,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
