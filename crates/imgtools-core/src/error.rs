use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the file system capability and the all-star placement.
#[derive(Error, Debug)]
pub enum Error {
    /// A file system call failed; `op` names the call.
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path must be absolute: {}", .0.display())]
    RelativePath(PathBuf),
}

impl Error {
    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        Error::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Errors from reading or writing embedded image metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),

    #[error("not a JPEG file")]
    NotJpeg,

    #[error("no EXIF data to write")]
    Empty,

    #[error("EXIF segment too large ({0} bytes)")]
    SegmentTooLarge(usize),
}
