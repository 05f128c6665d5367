use std::path::Path;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fs::FileSystem;
use crate::info::FileInfo;
use crate::metadata::MetadataAccess;
use crate::pattern;

/// Which fallback sources the resolver may consult. Embedded metadata is
/// always read for JPEG files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveFlags {
    #[serde(default)]
    pub use_filename: bool,
    #[serde(default)]
    pub use_filesystem_time: bool,
}

impl ResolveFlags {
    pub fn filename_only() -> Self {
        Self {
            use_filename: true,
            use_filesystem_time: false,
        }
    }
}

/// What one source contributed to a resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome {
    Contributed(FileInfo),
    Unavailable(String),
}

/// Merges filesystem time, filename and embedded metadata into a [`FileInfo`].
///
/// Priority per field is embedded metadata > filename > filesystem time.
pub struct Resolver<'a> {
    fs: &'a dyn FileSystem,
    metadata: &'a dyn MetadataAccess,
}

impl<'a> Resolver<'a> {
    pub fn new(fs: &'a dyn FileSystem, metadata: &'a dyn MetadataAccess) -> Self {
        Self { fs, metadata }
    }

    /// Resolve the normalized info for `path`, or `None` if it cannot be
    /// determined. Failures are logged, never raised.
    pub fn resolve(&self, path: &Path, flags: ResolveFlags) -> Option<FileInfo> {
        let mut sources = Vec::with_capacity(3);
        if flags.use_filesystem_time {
            match self.from_filesystem(path) {
                Ok(outcome) => sources.push(("filesystem", outcome)),
                Err(e) => {
                    debug!("error while reading file (do you have file permissions?): {}", e);
                    return None;
                }
            }
        }
        if flags.use_filename {
            sources.push(("filename", self.from_filename(path)));
        }
        if pattern::is_jpeg_filename(path) {
            sources.push(("exif", self.from_exif(path)));
        }

        let merged = fold_sources(sources);
        if merged.is_empty() {
            debug!("could not read EXIF, file or filename data for {}", path.display());
            return None;
        }
        merged.normalized()
    }

    /// Rotation in degrees from the orientation tag; 0 when unknown.
    pub fn image_rotation(&self, path: &Path) -> i32 {
        match self.metadata.read_metadata(path) {
            Ok(md) => md.rotation(),
            Err(e) => {
                debug!("no orientation for {}: {}", path.display(), e);
                0
            }
        }
    }

    fn from_filename(&self, path: &Path) -> SourceOutcome {
        match pattern::parse_path(path) {
            Some(info) => SourceOutcome::Contributed(info),
            None => SourceOutcome::Unavailable("no filename pattern matched".to_string()),
        }
    }

    fn from_filesystem(&self, path: &Path) -> crate::Result<SourceOutcome> {
        let mtime = self.fs.modified(path)?;
        let local: DateTime<Local> = mtime.into();
        let mut info = pattern::parse_path(path).unwrap_or_default();
        info.set_datetime(&local.naive_local());
        Ok(SourceOutcome::Contributed(info))
    }

    fn from_exif(&self, path: &Path) -> SourceOutcome {
        let md = match self.metadata.read_metadata(path) {
            Ok(md) => md,
            Err(e) => return SourceOutcome::Unavailable(e.to_string()),
        };
        let mut info = pattern::parse_path(path).unwrap_or_default();
        match md.capture_timestamp {
            Some(dt) => info.set_datetime(&dt),
            None => debug!("unable to get all EXIF information from {}", path.display()),
        }
        SourceOutcome::Contributed(info)
    }
}

/// Fold source outcomes left to right; later contributions win per field.
pub fn fold_sources<I>(sources: I) -> FileInfo
where
    I: IntoIterator<Item = (&'static str, SourceOutcome)>,
{
    let mut info = FileInfo::default();
    for (name, outcome) in sources {
        match outcome {
            SourceOutcome::Contributed(partial) => {
                info.merge(partial);
                debug!("- after reading from {}: {:?}", name, info);
            }
            SourceOutcome::Unavailable(reason) => {
                debug!("- {} unavailable: {}", name, reason);
            }
        }
    }
    info
}
