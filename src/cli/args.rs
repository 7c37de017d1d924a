//! CLI argument definitions using clap
//!
//! Commands:
//! - docbin list <input> [offset] [--key <KEY>] [--content]
//! - docbin read <input> [offset]
//! - docbin count <input> [offset]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::container::CompressionType;

/// docbin - inspect flat binary document containers
#[derive(Parser, Debug)]
#[command(name = "docbin")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Compression type of the container: gzip, none, zip, bzip2, bz2, br,
    /// brotli or lz4 [default: gzip]
    #[arg(long, global = true)]
    pub compress_type: Option<CompressionType>,

    /// Log every record read to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List documents from a position
    #[command(visible_aliases = ["l", "ls"])]
    List {
        /// Container file
        input: PathBuf,

        /// Byte offset of the first record
        #[arg(default_value_t = 0)]
        offset: u64,

        /// Only list documents with this key
        #[arg(long)]
        key: Option<String>,

        /// Decompress and include document content
        #[arg(long)]
        content: bool,
    },

    /// Read the document at a position
    #[command(visible_aliases = ["r", "ra"])]
    Read {
        /// Container file
        input: PathBuf,

        /// Byte offset of the record
        #[arg(default_value_t = 0)]
        offset: u64,
    },

    /// Count documents from a position
    #[command(visible_alias = "c")]
    Count {
        /// Container file
        input: PathBuf,

        /// Byte offset of the first record
        #[arg(default_value_t = 0)]
        offset: u64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
