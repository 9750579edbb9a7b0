pub mod handlers;

use crate::presentation::cli::Cli;
use clap::Parser;
use partzip_core::error::Result;
use partzip_core::{PackOptions, PartitionPolicy};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let policy = PartitionPolicy {
        max_partition_bytes: cli.max_bytes,
        max_files: cli.max_files,
        follow_links: cli.follow_links,
    };
    if cli.dry_run {
        return handlers::handle_plan(cli.source, policy, cli.json);
    }

    let opts = PackOptions {
        codec: cli.codec,
        level: cli.level,
        deterministic: cli.deterministic,
        jobs: cli.jobs,
        ..Default::default()
    };
    handlers::handle_pack(cli.source, cli.dest, policy, opts, cli.json)
}
