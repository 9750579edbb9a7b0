use clap::Parser;
use partzip_core::{CodecId, DEFAULT_MAX_PARTITION_BYTES};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Split a directory into size-bounded partitions and archive each one concurrently",
    long_about = None
)]
pub struct Cli {
    /// Directory to partition
    pub source: PathBuf,

    /// Directory that receives the partition_<N> archives (created if missing)
    pub dest: PathBuf,

    /// Partition ceiling in bytes; a single larger file still gets its own partition
    #[arg(long = "max-bytes", default_value_t = DEFAULT_MAX_PARTITION_BYTES,
          value_parser = clap::value_parser!(u64).range(1..))]
    pub max_bytes: u64,

    /// Also close a partition once it holds this many files
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Archive format: zstd, gzip or store (tar streams) or zip
    #[arg(long, default_value_t = CodecId::Zstd)]
    pub codec: CodecId,

    /// Compression level (zstd 1-22, gzip and zip 0-9)
    #[arg(long)]
    pub level: Option<i32>,

    /// Run at most N packaging tasks at once (default: one per partition)
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Zero entry timestamps so identical inputs give identical archives
    #[arg(long)]
    pub deterministic: bool,

    /// Follow symbolic links while walking the source tree
    #[arg(long)]
    pub follow_links: bool,

    /// Print the partition plan without writing archives
    #[arg(long)]
    pub dry_run: bool,

    /// Emit the plan or the run report as JSON on stdout
    #[arg(long)]
    pub json: bool,
}
