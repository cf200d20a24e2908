use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mempack_pack::PackCodec;
use mempack_types::ObjectType;

#[derive(Parser)]
#[command(
    name = "mempack",
    about = "In-memory git object store and pack tools",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compute object ids for files
    HashObject(HashObjectArgs),
    /// Load files as blobs and flush them to a pack
    Pack(PackArgs),
    /// Decode a pack, check it against its index, and list its objects
    Verify(VerifyArgs),
}

/// Pack stream settings shared by `pack` and `verify`.
#[derive(Args, Clone, Debug, Default)]
pub struct PackSettings {
    /// Use 32-byte SHA-256 ids instead of SHA-1
    #[arg(long)]
    pub sha256: bool,
    /// Payload codec (default: zlib)
    #[arg(long)]
    pub codec: Option<PackCodec>,
    /// Compression level for the codec
    #[arg(long)]
    pub level: Option<i32>,
    /// TOML file with pack options; flags override it
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashObjectArgs {
    #[arg(short = 't', long = "type", default_value = "blob")]
    pub kind: ObjectType,
    #[arg(long)]
    pub sha256: bool,
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct PackArgs {
    #[command(flatten)]
    pub settings: PackSettings,
    /// Directory receiving pack-<checksum>.pack and .idx
    #[arg(short, long)]
    pub output: PathBuf,
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub settings: PackSettings,
    pub pack: PathBuf,
}
