use crate::domain::Partition;
use crate::error::{PartzipError, Result};
use crate::pack::writer::{PackOptions, write_partition};
use crate::stats::{PackReport, PartitionReport};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Instant;
use time::OffsetDateTime;
use tracing::{info, warn};

/// Shared stop flag, checked by packaging tasks between entries.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Builds one archive per partition in `out_dir`, all partitions at once.
///
/// Returns only after every task has finished. Per-file and per-archive
/// failures are carried in the report; `Err` is reserved for setup problems
/// (bad options, unusable output directory).
pub fn pack_all(
    partitions: &[Partition],
    out_dir: &Path,
    opts: &PackOptions,
) -> Result<PackReport> {
    opts.codec.check_level(opts.effective_level())?;
    if opts.jobs == Some(0) {
        return Err(PartzipError::InvalidOption("jobs must be at least 1".into()));
    }
    fs::create_dir_all(out_dir)?;

    let started = Instant::now();
    let created = if opts.deterministic {
        0
    } else {
        OffsetDateTime::now_utc().unix_timestamp()
    };
    info!(
        partitions = partitions.len(),
        codec = %opts.codec,
        jobs = ?opts.jobs,
        "packing"
    );

    // the only state shared between tasks
    let (tx, rx) = mpsc::channel::<PartitionReport>();
    match opts.jobs {
        None => spawn_per_partition(partitions, out_dir, opts, &tx),
        Some(n) => run_on_pool(n, partitions, out_dir, opts, &tx)?,
    }
    drop(tx);

    let mut reports: Vec<PartitionReport> = rx.into_iter().collect();
    reports.sort_by_key(|r| r.index);

    Ok(PackReport {
        created,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        partitions: reports,
    })
}

fn spawn_per_partition(
    partitions: &[Partition],
    out_dir: &Path,
    opts: &PackOptions,
    tx: &Sender<PartitionReport>,
) {
    thread::scope(|s| {
        for p in partitions {
            let task_tx = tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("partition-{}", p.ordinal()))
                .spawn_scoped(s, move || {
                    let _ = task_tx.send(write_partition(p, out_dir, opts));
                });
            if let Err(e) = spawned {
                warn!(partition = p.ordinal(), error = %e, "thread spawn failed; packing inline");
                let _ = tx.send(write_partition(p, out_dir, opts));
            }
        }
    });
}

fn run_on_pool(
    jobs: usize,
    partitions: &[Partition],
    out_dir: &Path,
    opts: &PackOptions,
    tx: &Sender<PartitionReport>,
) -> Result<()> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("partzip-{i}"))
        .build()?;
    pool.scope(|s| {
        for p in partitions {
            let task_tx = tx.clone();
            s.spawn(move |_| {
                let _ = task_tx.send(write_partition(p, out_dir, opts));
            });
        }
    });
    Ok(())
}
