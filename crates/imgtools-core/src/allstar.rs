//! Copying pictures into "All Stars" folders.
//!
//! An all-star folder is always a child of some ancestor of the picture. The
//! search starts in the picture's own directory and walks upward; the first
//! level holding any all-star folder gets a copy in each of them. If no level
//! up to the root has one, an `AllStars` folder is created next to the
//! picture.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::pattern;
use crate::{BatchReport, ThrottledProgress};

pub const DEFAULT_FOLDER_NAME: &str = "AllStars";

static FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^all ?stars?$").unwrap());

/// Where a picture was copied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    /// Full paths of the copies.
    pub copies: Vec<PathBuf>,
    /// Whether a new all-star folder had to be created.
    pub created_folder: bool,
}

pub fn is_all_star_folder(name: &str) -> bool {
    FOLDER_RE.is_match(name)
}

/// All-star folders directly under `dir`, sorted by name.
pub fn find_all_star_folders(fs: &dyn FileSystem, dir: &Path) -> Result<Vec<PathBuf>> {
    debug!("looking for all star folders in {}", dir.display());
    let mut names = fs.list_children(dir)?;
    names.sort();

    let mut found = Vec::new();
    for name in names {
        if !is_all_star_folder(&name) {
            continue;
        }
        let path = dir.join(&name);
        if fs.is_dir(&path) {
            debug!("- {} is a confirmed all star directory", path.display());
            found.push(path);
        } else {
            debug!("- {} matches but is not a directory", path.display());
        }
    }
    Ok(found)
}

/// Copy `source` into the nearest all-star folder(s), creating one next to
/// it when none exists up to the root.
pub fn place(fs: &dyn FileSystem, source: &Path) -> Result<Placement> {
    if !source.is_absolute() {
        return Err(Error::RelativePath(source.to_path_buf()));
    }
    let home = source
        .parent()
        .ok_or_else(|| Error::RelativePath(source.to_path_buf()))?;

    let max_depth = home.components().count();
    let mut dir = home;
    for _ in 0..max_depth {
        info!("looking in {} for an AllStars folder...", dir.display());
        let folders = find_all_star_folders(fs, dir)?;
        if !folders.is_empty() {
            let mut copies = Vec::with_capacity(folders.len());
            for folder in &folders {
                info!("found existing AllStar folder {}", folder.display());
                copies.push(copy_into(fs, source, folder)?);
            }
            return Ok(Placement {
                copies,
                created_folder: false,
            });
        }
        match dir.parent() {
            Some(parent) => {
                debug!("no all star folders at the current level");
                dir = parent;
            }
            None => break,
        }
    }

    let folder = home.join(DEFAULT_FOLDER_NAME);
    info!("creating new all-star folder {}", folder.display());
    fs.create_dir(&folder)?;
    let copy = copy_into(fs, source, &folder)?;
    Ok(Placement {
        copies: vec![copy],
        created_folder: true,
    })
}

/// Place every path, continuing past failures.
///
/// Camera-generated names (`IMG_1234.JPG`) are copied as they are, with a
/// warning, since they will spread to every all-star folder.
pub fn copy_to_all_stars(
    fs: &dyn FileSystem,
    paths: &[PathBuf],
    progress: &ThrottledProgress,
) -> BatchReport {
    let mut report = BatchReport::default();
    let total = paths.len() as u64;
    for (i, path) in paths.iter().enumerate() {
        progress.report("allstar", i as u64, total, "Copying to all-star folders");
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if pattern::looks_auto_generated(&name) {
            let msg = format!("file {name} should be renamed before it is copied around");
            warn!("{}", msg);
            report.warn(msg);
        }
        match place(fs, path) {
            Ok(placement) => {
                debug!("{} -> {:?}", path.display(), placement.copies);
                report.processed += 1;
            }
            Err(e) => report.fail(format!("{}: {e}", path.display())),
        }
    }
    report
}

fn copy_into(fs: &dyn FileSystem, source: &Path, folder: &Path) -> Result<PathBuf> {
    // `place` only accepts paths with a parent, so a file name is present.
    let name = source.file_name().unwrap_or_default();
    let target = folder.join(name);
    info!("copying {} to all-star folder {}", source.display(), folder.display());
    fs.copy(source, &target)?;
    Ok(target)
}
