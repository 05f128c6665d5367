use std::path::{Path, PathBuf};

use anyhow::Context;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::metadata::MetadataAccess;
use crate::pattern;
use crate::{BatchReport, ThrottledProgress};

pub const SCALED_SUFFIX: &str = ".scaled";
pub const DEFAULT_LIMIT_SIZE: u32 = 1200;

fn default_limit_size() -> u32 {
    DEFAULT_LIMIT_SIZE
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleOptions {
    /// Longest side of the output, in pixels.
    #[serde(default = "default_limit_size")]
    pub limit_size: u32,
    #[serde(default)]
    pub greyscale: bool,
    /// Log instead of writing files.
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for ScaleOptions {
    fn default() -> Self {
        Self {
            limit_size: DEFAULT_LIMIT_SIZE,
            greyscale: false,
            dry_run: false,
        }
    }
}

/// `dir/name.ext` -> `dir/name.scaled.ext`
pub fn target_path(source: &Path) -> PathBuf {
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match source.extension() {
        Some(ext) => format!("{stem}{SCALED_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{SCALED_SUFFIX}"),
    };
    source.with_file_name(name)
}

/// Shrink to fit within `limit` x `limit`, keeping the aspect ratio.
/// Smaller images are left alone.
pub fn process_image(img: DynamicImage, options: &ScaleOptions) -> DynamicImage {
    let img = if options.greyscale {
        debug!("converting image to greyscale...");
        img.grayscale()
    } else {
        img
    };
    let limit = options.limit_size.max(1);
    if img.width() <= limit && img.height() <= limit {
        return img;
    }
    debug!("scaling image...");
    img.resize(limit, limit, FilterType::Lanczos3)
}

/// Write a scaled copy of `source` and carry its EXIF over. Returns the
/// target path.
pub fn scale_file(
    metadata: &dyn MetadataAccess,
    source: &Path,
    options: &ScaleOptions,
    report: &mut BatchReport,
) -> anyhow::Result<PathBuf> {
    info!("scaling file: {}", source.display());
    let target = target_path(source);
    debug!("target path: {}", target.display());

    let img = image::open(source).with_context(|| format!("reading {}", source.display()))?;
    let scaled = process_image(img, options);

    if options.dry_run {
        info!("[dry run] not writing {}", target.display());
        return Ok(target);
    }
    scaled
        .save(&target)
        .with_context(|| format!("writing {}", target.display()))?;

    if pattern::is_jpeg_filename(source) {
        if let Err(e) = metadata.copy_metadata(source, &target) {
            let msg = format!("unable to copy EXIF metadata to {}: {e}", target.display());
            warn!("{}", msg);
            report.warn(msg);
        }
    }
    Ok(target)
}

/// Scale every image in `paths`, continuing past failures.
pub fn scale(
    metadata: &dyn MetadataAccess,
    paths: &[PathBuf],
    options: &ScaleOptions,
    progress: &ThrottledProgress,
) -> anyhow::Result<BatchReport> {
    let mut report = BatchReport::default();
    let total = paths.len() as u64;
    for (i, path) in paths.iter().enumerate() {
        progress.report("scale", i as u64, total, "Scaling images");
        if !pattern::is_image_filename(path) {
            report.skip(format!("{} doesn't look like an image file", path.display()));
            continue;
        }
        match scale_file(metadata, path, options, &mut report) {
            Ok(_) => report.processed += 1,
            Err(e) => report.fail(format!("{e:#}")),
        }
    }
    Ok(report)
}
