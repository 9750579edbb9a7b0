use serde::Serialize;
use std::path::{Path, PathBuf};

/// A regular file seen during the walk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub path: PathBuf,
    pub size: u64,
}

impl FileRecord {
    /// Name the file is stored under inside an archive.
    pub fn entry_name(&self) -> Option<&Path> {
        self.path.file_name().map(Path::new)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    pub index: usize,
    pub files: Vec<FileRecord>,
}

impl Partition {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            files: Vec::new(),
        }
    }

    /// 1-based ordinal used for archive names.
    pub fn ordinal(&self) -> usize {
        self.index + 1
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True for the single-file partition allowed to exceed the ceiling.
    pub fn is_oversized(&self, ceiling: u64) -> bool {
        self.files.len() == 1 && self.files[0].size > ceiling
    }
}
