#![forbid(unsafe_code)]

pub mod domain;
pub mod error;
pub mod policy;
pub mod stats;

pub mod util {
    pub mod hash_forward;
}

pub mod codec;

pub mod pack {
    pub mod runner;
    pub mod walker;
    pub mod writer;
}

// Re-exports: stable API surface
pub use codec::CodecId;
pub use domain::{FileRecord, Partition};
pub use error::{PartzipError, Result};
pub use pack::runner::{CancelToken, pack_all};
pub use pack::walker::partition;
pub use pack::writer::{PackOptions, archive_name, write_partition};
pub use policy::{DEFAULT_MAX_PARTITION_BYTES, PartitionPolicy};
pub use stats::{PackReport, PartitionReport, SkippedFile};
