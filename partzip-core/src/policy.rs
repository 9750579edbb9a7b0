use serde::{Deserialize, Serialize};

/// 1000 MiB, the ceiling used when none is configured.
pub const DEFAULT_MAX_PARTITION_BYTES: u64 = 1024 * 1024 * 1000;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PartitionPolicy {
    /// Caps every partition except one holding a lone oversized file.
    pub max_partition_bytes: u64,
    /// Optional cap on entries per partition; closes a partition early.
    pub max_files: Option<usize>,
    pub follow_links: bool,
}

impl Default for PartitionPolicy {
    fn default() -> Self {
        Self {
            max_partition_bytes: DEFAULT_MAX_PARTITION_BYTES,
            max_files: None,
            follow_links: false,
        }
    }
}

impl PartitionPolicy {
    pub fn with_ceiling(max_partition_bytes: u64) -> Self {
        Self {
            max_partition_bytes,
            ..Default::default()
        }
    }
}
