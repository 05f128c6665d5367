use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag};
use filetime::FileTime;

use crate::error::MetadataError;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Embedded metadata of one image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    /// When the picture was taken. EXIF datetimes have no timezone.
    pub capture_timestamp: Option<NaiveDateTime>,
    /// EXIF orientation enum (1..=8).
    pub orientation: Option<u32>,
    /// The raw TIFF-structured EXIF blob, used to copy metadata between files.
    pub raw: Option<Vec<u8>>,
}

impl ImageMetadata {
    /// Rotation in degrees needed to display the image upright.
    pub fn rotation(&self) -> i32 {
        match self.orientation {
            Some(3) => 180,
            Some(6) => -90,
            Some(8) => 90,
            _ => 0,
        }
    }
}

/// Read and write access to embedded image metadata.
pub trait MetadataAccess: Send + Sync {
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, MetadataError>;

    /// Replace the metadata of `path` with `metadata`, keeping the file's
    /// access and modification times.
    fn write_metadata(&self, path: &Path, metadata: &ImageMetadata) -> Result<(), MetadataError>;

    /// Copy the full metadata set of `src` onto `dst`.
    fn copy_metadata(&self, src: &Path, dst: &Path) -> Result<(), MetadataError> {
        let md = self.read_metadata(src)?;
        self.write_metadata(dst, &md)
    }
}

/// EXIF in JPEG files.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExifStore;

impl MetadataAccess for ExifStore {
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, MetadataError> {
        let file = File::open(path)?;
        let exif = Reader::new().read_from_container(&mut BufReader::new(file))?;

        let capture_timestamp = [Tag::DateTimeOriginal, Tag::DateTimeDigitized]
            .iter()
            .filter_map(|tag| exif.get_field(*tag, In::PRIMARY))
            .find_map(|field| parse_exif_datetime(&field.display_value().to_string()));

        let orientation = exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0));

        Ok(ImageMetadata {
            capture_timestamp,
            orientation,
            raw: Some(exif.buf().to_vec()),
        })
    }

    fn write_metadata(&self, path: &Path, metadata: &ImageMetadata) -> Result<(), MetadataError> {
        let raw = metadata.raw.as_deref().ok_or(MetadataError::Empty)?;

        let stat = fs::metadata(path)?;
        let atime = FileTime::from_last_access_time(&stat);
        let mtime = FileTime::from_last_modification_time(&stat);

        let jpeg = fs::read(path)?;
        let spliced = splice_exif(&jpeg, raw)?;
        fs::write(path, spliced)?;

        filetime::set_file_times(path, atime, mtime)?;
        Ok(())
    }
}

/// Parses `YYYY:MM:DD HH:MM:SS`, tolerating other date separators. A value
/// with only a usable date part reads as midnight.
fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s.replace(['-', '/', '\\', '.'], ":");
    let cleaned = cleaned.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(cleaned, "%Y:%m:%d %H:%M:%S") {
        return Some(dt);
    }
    let date = cleaned.split(' ').next()?;
    NaiveDate::parse_from_str(date, "%Y:%m:%d").ok()?.and_hms_opt(0, 0, 0)
}

/// Rebuild a JPEG stream with `tiff` as its only EXIF APP1 segment.
///
/// The new segment goes right after SOI and any leading APP0 (JFIF)
/// segments. Everything from the start-of-scan marker on is copied as is.
pub fn splice_exif(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, MetadataError> {
    if jpeg.len() < 4 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(MetadataError::NotJpeg);
    }
    let seg_len = EXIF_HEADER.len() + tiff.len() + 2;
    if seg_len > u16::MAX as usize {
        return Err(MetadataError::SegmentTooLarge(seg_len));
    }

    let mut app1 = Vec::with_capacity(seg_len + 2);
    app1.extend_from_slice(&[0xFF, 0xE1]);
    app1.extend_from_slice(&(seg_len as u16).to_be_bytes());
    app1.extend_from_slice(EXIF_HEADER);
    app1.extend_from_slice(tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    let mut inserted = false;
    let mut pos = 2;

    loop {
        // Skip fill bytes.
        while pos + 1 < jpeg.len() && jpeg[pos] == 0xFF && jpeg[pos + 1] == 0xFF {
            pos += 1;
        }
        if pos + 2 > jpeg.len() || jpeg[pos] != 0xFF {
            return Err(MetadataError::NotJpeg);
        }
        let marker = jpeg[pos + 1];
        if marker == 0xDA || marker == 0xD9 {
            if !inserted {
                out.extend_from_slice(&app1);
            }
            out.extend_from_slice(&jpeg[pos..]);
            return Ok(out);
        }
        if pos + 4 > jpeg.len() {
            return Err(MetadataError::NotJpeg);
        }

        let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
        let end = pos + 2 + len;
        if len < 2 || end > jpeg.len() {
            return Err(MetadataError::NotJpeg);
        }
        let segment = &jpeg[pos..end];
        let is_exif = marker == 0xE1 && segment[4..].starts_with(EXIF_HEADER);

        if !inserted && marker != 0xE0 {
            out.extend_from_slice(&app1);
            inserted = true;
        }
        if !is_exif {
            out.extend_from_slice(segment);
        }
        pos = end;
    }
}
