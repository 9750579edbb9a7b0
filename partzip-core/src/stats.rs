use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A file that did not make it into its archive intact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of building one partition's archive.
///
/// Each file the task reached is counted once: as a written entry, as
/// `damaged` (entry present but zero-padded after a failed read) or as
/// `skipped` (no entry). Files after a cancellation are not counted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartitionReport {
    pub index: usize,
    pub archive_path: PathBuf,
    /// Intact entries only.
    pub entries_written: u64,
    /// Source bytes of the intact entries.
    pub bytes_in: u64,
    /// Bytes of the finished archive file.
    pub bytes_out: u64,
    /// Hex BLAKE3 of the archive file; absent when it was never finalized.
    pub blake3: Option<String>,
    pub skipped: Vec<SkippedFile>,
    pub damaged: Vec<SkippedFile>,
    /// Set when the archive file could not be created or finalized.
    pub archive_error: Option<String>,
    pub cancelled: bool,
}

impl PartitionReport {
    pub fn new(index: usize, archive_path: PathBuf) -> Self {
        Self {
            index,
            archive_path,
            ..Default::default()
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.archive_error.is_none()
    }

    pub fn archive_name(&self) -> String {
        self.archive_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PackReport {
    /// Unix seconds; zero in deterministic mode.
    pub created: i64,
    pub elapsed_ms: u64,
    pub partitions: Vec<PartitionReport>,
}

impl PackReport {
    pub fn archives_created(&self) -> usize {
        self.partitions.iter().filter(|p| p.is_finalized()).count()
    }

    pub fn failed_archives(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| !p.is_finalized())
    }

    pub fn skipped_files(&self) -> impl Iterator<Item = (usize, &SkippedFile)> {
        self.partitions
            .iter()
            .flat_map(|p| p.skipped.iter().map(move |s| (p.index, s)))
    }

    pub fn damaged_files(&self) -> impl Iterator<Item = (usize, &SkippedFile)> {
        self.partitions
            .iter()
            .flat_map(|p| p.damaged.iter().map(move |s| (p.index, s)))
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &PartitionReport> {
        self.partitions.iter().filter(|p| p.cancelled)
    }

    pub fn error_count(&self) -> usize {
        self.partitions
            .iter()
            .map(|p| p.skipped.len() + p.damaged.len() + usize::from(p.archive_error.is_some()))
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.error_count() == 0 && !self.partitions.iter().any(|p| p.cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_errors_across_partitions() {
        let mut a = PartitionReport::new(0, "out/partition_1.tar.zst".into());
        a.skipped.push(SkippedFile {
            path: "src/gone.txt".into(),
            reason: "not found".into(),
        });
        let mut b = PartitionReport::new(1, "out/partition_2.tar.zst".into());
        b.archive_error = Some("permission denied".into());
        let mut c = PartitionReport::new(2, "out/partition_3.tar.zst".into());
        c.damaged.push(SkippedFile {
            path: "src/shrunk.log".into(),
            reason: "read stopped".into(),
        });
        c.cancelled = true;
        let report = PackReport {
            partitions: vec![a, b, c],
            ..Default::default()
        };
        assert_eq!(report.error_count(), 3);
        assert_eq!(report.archives_created(), 2);
        assert_eq!(report.damaged_files().next().map(|(i, _)| i), Some(2));
        assert_eq!(report.cancelled().count(), 1);
        assert_eq!(report.failed_archives().count(), 1);
        assert_eq!(report.skipped_files().next().map(|(i, _)| i), Some(0));
        assert!(!report.is_clean());
        assert_eq!(report.partitions[0].archive_name(), "partition_1.tar.zst");
    }
}
