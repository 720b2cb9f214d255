use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use ul_types::HashKind;

#[derive(Parser)]
#[command(
    name = "ul",
    about = "UL: content-addressed file store with a provenance log",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Store root directory (default: current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Digest family: sha1, sha2, sha3, blake2b
    #[arg(long = "hash", global = true)]
    pub hash_kind: Option<HashKind>,

    /// TOML file with store settings; flags override it
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or open a store and print its node id
    Init,
    /// Add a file to the store and log it
    Put(PutArgs),
    /// Read an object
    Get(GetArgs),
    /// Check whether an object is present
    Exists(ExistsArgs),
    /// Print the log
    Log(LogArgs),
    /// Find stored objects missing from the log
    Check(CheckArgs),
    /// Copy every object from another sharded tree
    Import(ImportArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub file: PathBuf,
    /// Claimed content key (default: computed from the file)
    #[arg(long)]
    pub key: Option<String>,
    /// Tool or person responsible for the file
    #[arg(long)]
    pub src: Option<String>,
    /// Logical path to record (default: z@<file name>)
    #[arg(long)]
    pub path: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct ExistsArgs {
    pub key: String,
}

#[derive(Args)]
pub struct LogArgs {
    /// Only the last N entries
    #[arg(short = 'n', long)]
    pub tail: Option<usize>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Append an entry for every orphan found
    #[arg(long)]
    pub repair: bool,
    /// First top-level shard to visit
    #[arg(long, default_value = "00")]
    pub start_at: String,
    /// Maximum keys to check (0 = all)
    #[arg(long, default_value = "0")]
    pub limit: usize,
}

#[derive(Args)]
pub struct ImportArgs {
    /// Root of the sharded tree to copy from
    pub source: PathBuf,
}
