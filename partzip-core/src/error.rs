use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PartzipError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("walk failed at {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("partition ceiling must be a positive byte count")]
    InvalidCeiling,

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, PartzipError>;
