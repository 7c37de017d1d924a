//! Output formatting for CLI commands
//!
//! - list: one JSON object per record
//! - read: document text, then key, one per line
//! - count: the bare count
//!
//! Output is UTF-8 and flushed by the caller.

use std::io::Write;

use serde_json::json;

use super::errors::CliResult;
use crate::container::Document;

/// Write one listed record as a JSON line
pub fn write_listing<W: Write>(out: &mut W, offset: u64, document: &Document) -> CliResult<()> {
    let mut entry = json!({
        "offset": offset,
        "key": document.key,
        "tombstone": document.is_tombstone(),
    });
    if let Some(content) = &document.content {
        entry["content"] = json!(content);
    }

    serde_json::to_writer(&mut *out, &entry)?;
    writeln!(out)?;

    Ok(())
}

/// Write a point-read document: text first, then key
pub fn write_document<W: Write>(out: &mut W, document: &Document) -> CliResult<()> {
    let text = document.text().unwrap_or_default();
    writeln!(out, "{}", text)?;
    writeln!(out, "{}", document.key)?;

    Ok(())
}

/// Write a record count
pub fn write_count<W: Write>(out: &mut W, count: u64) -> CliResult<()> {
    writeln!(out, "{}", count)?;

    Ok(())
}
