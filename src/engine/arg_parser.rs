use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Move messages between gzip tar bundles and a newline-delimited JSON stream.
#[derive(Clone, Parser)]
#[command(name = "tarbridge")]
#[command(about = "Unpack tar.gz bundles into messages, or pack messages into tar.gz batches.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Read an archive (or every archive in a directory) and print one JSON message per line.
    Unpack {
        /// Archive file or directory of archives. Falls back to `input` in the config file.
        #[arg(value_name = "PATH")]
        input: Option<PathBuf>,
    },
    /// Read JSON messages from stdin and write them as tar.gz batches into DIR.
    Pack {
        /// Output directory, created if missing. Falls back to `output` in the config file.
        #[arg(value_name = "DIR")]
        output: Option<PathBuf>,

        /// Maximum messages per batch file.
        #[arg(long, short = 'b')]
        batch_size: Option<usize>,
    },
}

#[derive(Clone, Args)]
pub struct CommonArgs {
    /// Verbose output.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Keep going after an archive fails to decode; report all failures at the end.
    #[arg(long, global = true)]
    pub continue_on_error: bool,

    /// Capacity of the in-memory message queue.
    #[arg(long, global = true)]
    pub queue_capacity: Option<usize>,

    /// Directory holding `.tarbridge.toml` and `.env`. Default: current directory.
    #[arg(long, global = true, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
