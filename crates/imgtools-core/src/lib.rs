pub mod allstar;
pub mod error;
pub mod fs;
pub mod info;
pub mod metadata;
pub mod pattern;
pub mod resolve;
pub mod scaler;
pub mod stamper;

#[cfg(test)]
pub(crate) mod testing;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub use allstar::{copy_to_all_stars, place, Placement};
pub use error::{Error, MetadataError, Result};
pub use fs::{DryRunFs, FileSystem, StdFs};
pub use info::FileInfo;
pub use metadata::{ExifStore, ImageMetadata, MetadataAccess};
pub use resolve::{ResolveFlags, Resolver};
pub use scaler::{scale, ScaleOptions};
pub use stamper::{stamp, StampOptions};

/// Outcome of a batch run over many files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub processed: u64,
    /// Files that needed no change.
    #[serde(default)]
    pub unchanged: u64,
    pub skipped: u64,
    pub failed: u64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BatchReport {
    pub fn skip(&mut self, message: String) {
        info!("skipping: {}", message);
        self.skipped += 1;
    }

    pub fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    pub fn fail(&mut self, message: String) {
        error!("{}", message);
        self.failed += 1;
        self.errors.push(message);
    }
}

/// Resolved info and rotation for one file, as printed by `imgtools info`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageSummary {
    pub path: PathBuf,
    pub info: Option<FileInfo>,
    pub rotation: i32,
    pub auto_generated_name: bool,
}

pub fn summarize(resolver: &Resolver, path: &Path, flags: ResolveFlags) -> ImageSummary {
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    ImageSummary {
        path: path.to_path_buf(),
        info: resolver.resolve(path, flags),
        rotation: resolver.image_rotation(path),
        auto_generated_name: pattern::looks_auto_generated(&name),
    }
}

/// Expand the command-line paths into a sorted file list.
///
/// With `expand_dirs`, a directory is replaced by its immediate children;
/// subdirectories are not descended into.
pub fn collect_paths(fs: &dyn FileSystem, paths: &[PathBuf], expand_dirs: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        let path = std::path::absolute(path).map_err(|e| Error::io("absolute", path, e))?;
        if expand_dirs && fs.is_dir(&path) {
            for child in fs.list_children(&path)? {
                let child = path.join(child);
                if !fs.is_dir(&child) {
                    files.push(child);
                }
            }
        } else {
            files.push(path);
        }
    }
    files.sort();
    debug!("collected {} path(s)", files.len());
    Ok(files)
}

/// Progress sink called as `(stage, current, total, message)`.
pub type ProgressFn<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Forwards progress updates to a [`ProgressFn`], dropping those that arrive
/// sooner than `interval` after the last forwarded one. The update for the
/// final item always goes through.
pub struct ThrottledProgress<'a> {
    sink: &'a ProgressFn<'a>,
    interval: Duration,
    last_sent: Mutex<Option<Instant>>,
}

impl<'a> ThrottledProgress<'a> {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(200);

    pub fn new(sink: &'a ProgressFn<'a>) -> Self {
        Self::with_interval(sink, Self::DEFAULT_INTERVAL)
    }

    pub fn with_interval(sink: &'a ProgressFn<'a>, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            last_sent: Mutex::new(None),
        }
    }

    /// `current` is zero-based.
    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let last_item = current + 1 >= total;
        if last_item || self.due() {
            (self.sink)(stage, current, total, message);
        }
    }

    fn due(&self) -> bool {
        let Ok(mut last_sent) = self.last_sent.lock() else {
            return false;
        };
        let now = Instant::now();
        if (*last_sent).is_some_and(|t| now.duration_since(t) < self.interval) {
            return false;
        }
        *last_sent = Some(now);
        true
    }
}
