//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resumable downloads into a local resource cache.
///
/// Interrupted downloads pick up from the bytes already cached on the next run.
#[derive(Parser, Debug)]
#[command(name = "resource-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/resource-downloader/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache root directory (overrides the config file)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download a URL into the cache, resuming any partial data
    Fetch {
        /// URL to download
        url: String,
    },
    /// Print the remote size of a URL without downloading it
    Size {
        /// URL to probe
        url: String,
    },
    /// Print where a URL is stored in the cache
    Path {
        /// URL to map
        url: String,
    },
}
