use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use partzip_core::error::Result;
use partzip_core::{PackOptions, PackReport, Partition, PartitionPolicy, pack_all, partition};
use tracing::debug;

pub fn handle_plan(source: PathBuf, policy: PartitionPolicy, json: bool) -> Result<()> {
    let partitions = partition(&source, &policy)?;
    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &partitions).map_err(io::Error::from)?;
        writeln!(out)?;
        return Ok(());
    }
    writeln!(
        out,
        "{} partitions planned (ceiling {} bytes)",
        partitions.len(),
        policy.max_partition_bytes
    )?;
    for p in &partitions {
        print_partition(&mut out, p, policy.max_partition_bytes)?;
    }
    Ok(())
}

fn print_partition(out: &mut impl Write, p: &Partition, ceiling: u64) -> io::Result<()> {
    let flag = if p.is_oversized(ceiling) { "  [oversized]" } else { "" };
    writeln!(
        out,
        "partition_{}: {} files, {} bytes{flag}",
        p.ordinal(),
        p.len(),
        p.total_size()
    )?;
    for f in &p.files {
        writeln!(out, "  {}  {} bytes", f.path.display(), f.size)?;
    }
    Ok(())
}

pub fn handle_pack(
    source: PathBuf,
    dest: PathBuf,
    policy: PartitionPolicy,
    opts: PackOptions,
    json: bool,
) -> Result<()> {
    let started = Instant::now();
    let partitions = partition(&source, &policy)?;
    debug!(
        source = %source.display(),
        partitions = partitions.len(),
        walk = ?started.elapsed(),
        "plan ready"
    );
    if !json {
        println!("Total partitions created: {}", partitions.len());
    }

    let report = pack_all(&partitions, &dest, &opts)?;

    let mut out = io::stdout().lock();
    if json {
        serde_json::to_writer_pretty(&mut out, &report).map_err(io::Error::from)?;
        writeln!(out)?;
    } else {
        print_report(&mut out, &report, started.elapsed())?;
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &PackReport, elapsed: Duration) -> io::Result<()> {
    for p in &report.partitions {
        if p.is_finalized() {
            writeln!(
                out,
                "Created archive: {} ({} entries, {} -> {} bytes)",
                p.archive_name(),
                p.entries_written,
                p.bytes_in,
                p.bytes_out
            )?;
        }
    }
    for p in report.failed_archives() {
        writeln!(
            out,
            "Error creating {}: {}",
            p.archive_name(),
            p.archive_error.as_deref().unwrap_or("unknown")
        )?;
    }
    for (index, s) in report.skipped_files() {
        writeln!(
            out,
            "Error packing {} into partition_{}: {}",
            s.path.display(),
            index + 1,
            s.reason
        )?;
    }
    for (index, s) in report.damaged_files() {
        writeln!(
            out,
            "Damaged entry {} in partition_{}: {}",
            s.path.display(),
            index + 1,
            s.reason
        )?;
    }
    for p in report.cancelled() {
        writeln!(
            out,
            "Cancelled {} after {} entries",
            p.archive_name(),
            p.entries_written
        )?;
    }

    let cancelled = report.cancelled().count();
    match report.error_count() {
        0 if cancelled == 0 => writeln!(out, "Packing completed successfully.")?,
        0 => {}
        n => writeln!(out, "Packing completed with {n} error(s).")?,
    }
    if cancelled > 0 {
        writeln!(out, "Packing cancelled in {cancelled} partition(s).")?;
    }
    writeln!(out, "Total time taken: {elapsed:?}")
}
