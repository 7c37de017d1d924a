//! CLI module for docbin
//!
//! Provides command-line interface for:
//! - list: enumerate documents from an offset
//! - read: point-read and decompress one document
//! - count: count documents from an offset

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{count, list, read, run, run_cli, run_command, Context};
pub use config::Config;
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{write_count, write_document, write_listing};
