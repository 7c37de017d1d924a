//! CLI command implementations
//!
//! Each command opens one container, runs exactly one scanner operation
//! and prints its result. Commands write to any `Write` so they can be
//! exercised without a terminal.

use std::io::{self, Write};
use std::path::Path;

use crate::container::{CompressionType, ContainerScanner, ScannerConfig};
use crate::observability::{Logger, Severity};

use super::args::{Cli, Command};
use super::config::Config;
use super::errors::{CliError, CliResult};
use super::io::{write_count, write_document, write_listing};

/// Settings shared by every command of one invocation
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub compression: CompressionType,
    pub scanner: ScannerConfig,
}

impl Context {
    fn open(&self, input: &Path) -> CliResult<ContainerScanner> {
        Ok(ContainerScanner::open_with_config(
            input,
            self.compression,
            self.scanner,
        )?)
    }
}

/// Main entry point for CLI
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_cli(cli)
}

/// Run a parsed command line against stdout
pub fn run_cli(cli: Cli) -> CliResult<()> {
    if cli.verbose {
        Logger::set_min_severity(Severity::Trace);
    }

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let ctx = Context {
        compression: config.resolve_compression(cli.compress_type),
        scanner: config.scanner_config(),
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_command(&cli.command, &ctx, &mut out)?;
    out.flush()?;

    Ok(())
}

/// Run the appropriate command based on CLI args
pub fn run_command<W: Write>(cmd: &Command, ctx: &Context, out: &mut W) -> CliResult<()> {
    match cmd {
        Command::List {
            input,
            offset,
            key,
            content,
        } => list(input, *offset, key.as_deref(), *content, ctx, out),
        Command::Read { input, offset } => read(input, *offset, ctx, out),
        Command::Count { input, offset } => count(input, *offset, ctx, out),
    }
}

/// List documents from `offset`, optionally only those keyed `key`
pub fn list<W: Write>(
    input: &Path,
    offset: u64,
    key: Option<&str>,
    content: bool,
    ctx: &Context,
    out: &mut W,
) -> CliResult<()> {
    let mut scanner = ctx.open(input)?;

    // First output failure wins; the scan itself still runs to completion
    let mut write_failure: Option<CliError> = None;
    scanner.list_matching(
        offset,
        |descriptor| key.map_or(true, |k| descriptor.key == k),
        content,
        |record_offset, document| {
            if write_failure.is_none() {
                if let Err(e) = write_listing(out, record_offset, &document) {
                    write_failure = Some(e);
                }
            }
        },
    )?;

    match write_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Read and decompress the document at `offset`
pub fn read<W: Write>(input: &Path, offset: u64, ctx: &Context, out: &mut W) -> CliResult<()> {
    let mut scanner = ctx.open(input)?;
    let document = scanner.read_at(offset, true)?;
    write_document(out, &document)
}

/// Count documents from `offset`
pub fn count<W: Write>(input: &Path, offset: u64, ctx: &Context, out: &mut W) -> CliResult<()> {
    let mut scanner = ctx.open(input)?;
    let count = scanner.count(offset)?;
    write_count(out, count)
}
