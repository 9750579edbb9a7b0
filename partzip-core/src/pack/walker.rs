use crate::domain::{FileRecord, Partition};
use crate::error::{PartzipError, Result};
use crate::policy::PartitionPolicy;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

/// Walks `root` once and packs its regular files, in traversal order, into
/// partitions no larger than `policy.max_partition_bytes`.
///
/// A file that alone exceeds the ceiling is never split and never shares a
/// partition. Any walk error aborts the whole plan.
pub fn partition(root: &Path, policy: &PartitionPolicy) -> Result<Vec<Partition>> {
    if policy.max_partition_bytes == 0 {
        return Err(PartzipError::InvalidCeiling);
    }
    if !fs::metadata(root)?.is_dir() {
        return Err(PartzipError::NotADirectory(root.to_path_buf()));
    }

    let mut planner = Planner::new(policy);
    let walk = WalkDir::new(root)
        .follow_links(policy.follow_links)
        .sort_by_file_name();
    for e in walk {
        let e = e.map_err(|e| walk_error(root, e))?;
        if !e.file_type().is_file() {
            // directories are structure only; symlinks are skipped unless followed
            continue;
        }
        let size = e.metadata().map_err(|e| walk_error(root, e))?.len();
        planner.push(FileRecord {
            path: e.into_path(),
            size,
        });
    }
    Ok(planner.finish())
}

fn walk_error(root: &Path, e: walkdir::Error) -> PartzipError {
    let path = e.path().unwrap_or(root).to_path_buf();
    PartzipError::Walk { path, source: e }
}

/// Greedy first-fit over a stream of files; order is preserved.
struct Planner<'a> {
    policy: &'a PartitionPolicy,
    done: Vec<Partition>,
    current: Partition,
    current_size: u64,
}

impl<'a> Planner<'a> {
    fn new(policy: &'a PartitionPolicy) -> Self {
        Self {
            policy,
            done: Vec::new(),
            current: Partition::new(0),
            current_size: 0,
        }
    }

    fn push(&mut self, file: FileRecord) {
        let over_bytes =
            self.current_size.saturating_add(file.size) > self.policy.max_partition_bytes;
        let over_count = self
            .policy
            .max_files
            .is_some_and(|max| self.current.len() >= max.max(1));
        if (over_bytes || over_count) && !self.current.is_empty() {
            self.close();
        }
        self.current_size += file.size;
        self.current.files.push(file);
    }

    fn close(&mut self) {
        let next = Partition::new(self.current.index + 1);
        let closed = std::mem::replace(&mut self.current, next);
        debug!(
            partition = closed.ordinal(),
            files = closed.len(),
            bytes = self.current_size,
            "partition closed"
        );
        self.done.push(closed);
        self.current_size = 0;
    }

    fn finish(mut self) -> Vec<Partition> {
        if !self.current.is_empty() {
            self.close();
        }
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs::File;
    use std::path::PathBuf;

    const MB: u64 = 1024 * 1024;

    fn sized(dir: &Path, rel: &str, len: u64) -> PathBuf {
        let p = dir.join(rel);
        if let Some(parent) = p.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        File::create(&p).unwrap().set_len(len).unwrap();
        p
    }

    fn names(parts: &[Partition]) -> Vec<Vec<String>> {
        parts
            .iter()
            .map(|p| {
                p.files
                    .iter()
                    .map(|f| f.entry_name().unwrap().to_string_lossy().into_owned())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn closes_partition_before_overflow() {
        let td = tempfile::tempdir().unwrap();
        for n in ["a.txt", "b.txt", "c.txt"] {
            sized(td.path(), n, 400 * MB);
        }
        let parts = partition(td.path(), &PartitionPolicy::with_ceiling(1000 * MB)).unwrap();
        assert_eq!(names(&parts), vec![vec!["a.txt", "b.txt"], vec!["c.txt"]]);
        assert_eq!(parts[0].total_size(), 800 * MB);
        assert_eq!(parts[1].total_size(), 400 * MB);
        assert_eq!(parts[1].index, 1);
    }

    #[test]
    fn lone_oversized_file_gets_its_own_partition() {
        let td = tempfile::tempdir().unwrap();
        sized(td.path(), "huge.bin", 2000 * MB);
        let parts = partition(td.path(), &PartitionPolicy::with_ceiling(1000 * MB)).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].is_oversized(1000 * MB));
        assert_eq!(parts[0].total_size(), 2000 * MB);
    }

    #[test]
    fn oversized_file_between_small_ones_is_isolated() {
        let td = tempfile::tempdir().unwrap();
        sized(td.path(), "a", 10);
        sized(td.path(), "b", 500);
        sized(td.path(), "c", 10);
        let parts = partition(td.path(), &PartitionPolicy::with_ceiling(100)).unwrap();
        assert_eq!(names(&parts), vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn empty_tree_has_no_partitions() {
        let td = tempfile::tempdir().unwrap();
        fs::create_dir_all(td.path().join("x/y/z")).unwrap();
        let parts = partition(td.path(), &PartitionPolicy::default()).unwrap();
        assert!(parts.is_empty());
    }

    #[test]
    fn walks_depth_first_in_name_order() {
        let td = tempfile::tempdir().unwrap();
        sized(td.path(), "b/inner.txt", 1);
        sized(td.path(), "a.txt", 1);
        sized(td.path(), "c.txt", 1);
        sized(td.path(), "b/a/deep.txt", 1);
        let parts = partition(td.path(), &PartitionPolicy::with_ceiling(1 << 20)).unwrap();
        assert_eq!(
            names(&parts),
            vec![vec!["a.txt", "deep.txt", "inner.txt", "c.txt"]]
        );
    }

    #[test]
    fn max_files_closes_early() {
        let td = tempfile::tempdir().unwrap();
        for n in ["1", "2", "3", "4", "5"] {
            sized(td.path(), n, 1);
        }
        let policy = PartitionPolicy {
            max_files: Some(2),
            ..PartitionPolicy::with_ceiling(1000)
        };
        let parts = partition(td.path(), &policy).unwrap();
        assert_eq!(
            names(&parts),
            vec![vec!["1", "2"], vec!["3", "4"], vec!["5"]]
        );
    }

    #[test]
    fn rejects_bad_inputs() {
        let td = tempfile::tempdir().unwrap();
        let file = sized(td.path(), "plain.txt", 3);
        assert!(matches!(
            partition(td.path(), &PartitionPolicy::with_ceiling(0)),
            Err(PartzipError::InvalidCeiling)
        ));
        assert!(matches!(
            partition(&file, &PartitionPolicy::default()),
            Err(PartzipError::NotADirectory(_))
        ));
        assert!(matches!(
            partition(&td.path().join("missing"), &PartitionPolicy::default()),
            Err(PartzipError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_counted_by_default() {
        let td = tempfile::tempdir().unwrap();
        let target = sized(td.path(), "real.txt", 5);
        std::os::unix::fs::symlink(&target, td.path().join("link.txt")).unwrap();
        let parts = partition(td.path(), &PartitionPolicy::default()).unwrap();
        assert_eq!(names(&parts), vec![vec!["real.txt"]]);

        let follow = PartitionPolicy {
            follow_links: true,
            ..Default::default()
        };
        let parts = partition(td.path(), &follow).unwrap();
        assert_eq!(names(&parts), vec![vec!["link.txt", "real.txt"]]);
    }

    #[test]
    fn plan_is_a_bounded_deterministic_set_partition() {
        let td = tempfile::tempdir().unwrap();
        let ceiling = 4096;
        let mut expected = HashSet::new();
        let mut seed = 0x2545_f491_u64;
        for i in 0..120 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let size = (seed >> 33) % 6000;
            let rel = format!("d{}/s{}/f{i:03}.dat", i % 7, i % 3);
            expected.insert(sized(td.path(), &rel, size));
        }

        let policy = PartitionPolicy::with_ceiling(ceiling);
        let first = partition(td.path(), &policy).unwrap();
        let second = partition(td.path(), &policy).unwrap();
        assert_eq!(first, second);

        let mut seen = HashSet::new();
        for (i, p) in first.iter().enumerate() {
            assert_eq!(p.index, i);
            assert!(!p.is_empty());
            if !p.is_oversized(ceiling) {
                assert!(p.total_size() <= ceiling, "partition {i} over ceiling");
            }
            for f in &p.files {
                if f.size > ceiling {
                    assert_eq!(p.len(), 1, "oversized file shares partition {i}");
                }
                assert!(seen.insert(f.path.clone()), "duplicate {}", f.path.display());
            }
        }
        assert_eq!(seen, expected);
    }
}
