use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::fs::FileSystem;
use crate::info::FileInfo;
use crate::metadata::MetadataAccess;
use crate::pattern;
use crate::resolve::{ResolveFlags, Resolver};
use crate::{BatchReport, ThrottledProgress};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StampOptions {
    /// Strip any date/time stamp from the filename.
    #[serde(default)]
    pub strip: bool,
    /// Include the time in the stamp.
    #[serde(default)]
    pub time: bool,
    /// Fall back to the file's modification time.
    #[serde(default)]
    pub use_filesystem_time: bool,
}

impl StampOptions {
    fn flags(&self) -> ResolveFlags {
        ResolveFlags {
            use_filename: true,
            use_filesystem_time: self.use_filesystem_time,
        }
    }
}

/// New filename for a resolved record, or `None` if it has no date to stamp.
///
/// `YYYY-MM-DD title.ext`, `YYYY-MM-DD hh.mm title.ext` with `time`, or
/// `title.ext` with `strip`. Stripping always drops the time as well.
pub fn target_file_name(info: &FileInfo, options: &StampOptions) -> Option<String> {
    let title = info.title.as_deref()?;
    let ext = info.extension.as_deref()?;
    if options.strip {
        return Some(format!("{title}.{ext}"));
    }
    let (year, month, day) = (info.year.as_deref()?, info.month.as_deref()?, info.day.as_deref()?);
    match (options.time, info.hour.as_deref(), info.minute.as_deref()) {
        (true, Some(hour), Some(minute)) => {
            Some(format!("{year}-{month}-{day} {hour}.{minute} {title}.{ext}"))
        }
        _ => Some(format!("{year}-{month}-{day} {title}.{ext}")),
    }
}

/// Resolve and rename every image in `paths`.
///
/// Resolution runs in parallel; renames are applied one by one in path order.
pub fn stamp(
    fs: &dyn FileSystem,
    metadata: &dyn MetadataAccess,
    paths: &[PathBuf],
    options: &StampOptions,
    progress: &ThrottledProgress,
) -> anyhow::Result<BatchReport> {
    let mut report = BatchReport::default();
    let images: Vec<&PathBuf> = paths
        .iter()
        .filter(|p| {
            let keep = pattern::is_image_filename(p);
            if !keep {
                report.skip(format!("{} doesn't look like an image file", p.display()));
            }
            keep
        })
        .collect();

    let resolver = Resolver::new(fs, metadata);
    let flags = options.flags();
    let total = images.len() as u64;
    let counter = AtomicU64::new(0);
    let resolved: Vec<(&PathBuf, Option<FileInfo>)> = images
        .par_iter()
        .map(|&path| {
            let info = resolver.resolve(path, flags);
            let current = counter.fetch_add(1, Ordering::Relaxed);
            progress.report("resolve", current, total, "Reading dates");
            (path, info)
        })
        .collect();

    for (path, info) in resolved {
        let Some(new_name) = info.as_ref().and_then(|i| target_file_name(i, options)) else {
            report.skip(format!("unable to stamp file: {}", display_name(path)));
            continue;
        };
        match rename_to(fs, path, &new_name) {
            Ok(true) => report.processed += 1,
            Ok(false) => report.unchanged += 1,
            Err(e) => report.fail(format!("{}: {e:#}", path.display())),
        }
    }
    Ok(report)
}

/// Returns whether the file was renamed.
fn rename_to(fs: &dyn FileSystem, path: &Path, new_name: &str) -> anyhow::Result<bool> {
    if path.file_name().is_some_and(|n| n == new_name) {
        return Ok(false);
    }
    let dir = path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("no parent directory"))?;
    let target = dir.join(new_name);
    if fs.exists(&target) && !differs_only_in_case(path, &target) {
        anyhow::bail!("{} already exists", target.display());
    }
    info!("stamping {} -> {}", path.display(), new_name);
    fs.rename(path, &target)?;
    Ok(true)
}

/// A case-insensitive file system reports `target` as existing when it is
/// `path` itself with a different case.
fn differs_only_in_case(path: &Path, target: &Path) -> bool {
    match (path.to_str(), target.to_str()) {
        (Some(a), Some(b)) => a != b && a.to_lowercase() == b.to_lowercase(),
        _ => false,
    }
}

fn display_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    if name.is_none() {
        warn!("path without file name: {}", path.display());
    }
    name.unwrap_or_else(|| path.display().to_string())
}
