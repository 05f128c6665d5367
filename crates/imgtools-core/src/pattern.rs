use std::path::Path;
use std::sync::LazyLock;

use mime_guess::mime;
use regex::Regex;
use tracing::debug;

use crate::info::{Field, FileInfo};

/// Separator accepted between date parts and before the title.
const SEP: &str = r"[-_. /]";
/// Optional separator between hour and minute.
const TIME_SEP: &str = r"[.:]?";
const MONTH_ALPHA: &str = "(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec|june|july|sept|january|february|march|april|august|september|october|november|december)";

/// One row of the filename pattern table.
pub struct FilenamePattern {
    regex: Regex,
    fields: &'static [Field],
}

impl FilenamePattern {
    fn new(pattern: &str, fields: &'static [Field]) -> Self {
        let regex = Regex::new(pattern).unwrap();
        debug_assert_eq!(regex.captures_len() - 1, fields.len());
        Self { regex, fields }
    }

    /// Bind the captures of a match to this pattern's fields.
    pub fn apply(&self, filename: &str) -> Option<FileInfo> {
        let caps = self.regex.captures(filename)?;
        let mut info = FileInfo::default();
        for (i, field) in self.fields.iter().enumerate() {
            if let Some(m) = caps.get(i + 1) {
                info.set(*field, m.as_str());
            }
        }
        Some(info)
    }
}

/// Tried in order; the first match wins even if it leaves fields unset.
static PATTERNS: LazyLock<Vec<FilenamePattern>> = LazyLock::new(|| {
    use Field::*;
    vec![
        FilenamePattern::new(
            &format!(
                r"^([0-9]{{2}}|[0-9]{{4}}){SEP}([0-9]{{2}}){SEP}([0-9]{{2}}){SEP}([0-9]{{2}}){TIME_SEP}([0-9]{{2}}){SEP}+(.+)\.([A-Za-z0-9_]{{1,4}})"
            ),
            &[Year, Month, Day, Hour, Minute, Title, Extension],
        ),
        FilenamePattern::new(
            &format!(
                r"^([0-9]{{2}}|[0-9]{{4}}){SEP}([0-9]{{2}}){SEP}([0-9]{{2}}){SEP}+(.+)\.([A-Za-z0-9_]{{1,4}})"
            ),
            &[Year, Month, Day, Title, Extension],
        ),
        FilenamePattern::new(
            &format!(r"^{MONTH_ALPHA}{SEP}([0-9]{{2}}){SEP}(.+)\.([A-Za-z0-9_]{{1,4}})"),
            &[MonthAlpha, Year, Title, Extension],
        ),
        FilenamePattern::new(r"^(.+)\.([A-Za-z0-9_]{1,4})", &[Title, Extension]),
    ]
});

static AUTO_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"([0-9]{{3,}}{SEP}[0-9]{{3,}})|([0-9]{{5,}})|((IMG|P|DSCF?)_?[0-9]{{4,}})"
    ))
    .unwrap()
});

/// Parse a bare filename against the pattern table.
///
/// `filename` must not contain a directory component. Returns `None` only
/// when the name has no extension separator.
pub fn parse_filename(filename: &str) -> Option<FileInfo> {
    let result = PATTERNS.iter().find_map(|p| p.apply(filename));
    match &result {
        Some(info) => debug!("filename info for {}: {:?}", filename, info),
        None => debug!("no filename pattern matched {}", filename),
    }
    result
}

/// Parse the final component of `path`.
pub fn parse_path(path: &Path) -> Option<FileInfo> {
    let name = path.file_name()?.to_str()?;
    parse_filename(name)
}

/// True when the title still looks like a camera-generated name
/// (`IMG_1234`, `P1040425`, `20110725_123456`, ...).
pub fn looks_auto_generated(filename: &str) -> bool {
    let title = parse_filename(filename)
        .and_then(|info| info.title)
        .unwrap_or_else(|| filename.to_string());
    AUTO_NAME_RE.is_match(&title)
}

pub fn is_jpeg_filename(path: &Path) -> bool {
    mime_guess::from_path(path)
        .iter()
        .any(|m| m == mime::IMAGE_JPEG)
}

/// Images the tools know how to handle: JPEG, PNG, GIF and BMP.
pub fn is_image_filename(path: &Path) -> bool {
    mime_guess::from_path(path)
        .iter()
        .any(|m| m == mime::IMAGE_JPEG || m == mime::IMAGE_PNG || m == mime::IMAGE_GIF || m == mime::IMAGE_BMP)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(time: bool) -> FileInfo {
        let mut info = FileInfo::default();
        info.set(Field::Year, "2011");
        info.set(Field::Month, "02");
        info.set(Field::Day, "12");
        if time {
            info.set(Field::Hour, "11");
            info.set(Field::Minute, "33");
        }
        info.set(Field::Title, "The title of the Picture");
        info.set(Field::Extension, "Jpg");
        info
    }

    #[test]
    fn test_date_title_pattern() {
        let want = expected(false);
        assert_eq!(parse_filename("2011-02.12-The title of the Picture.Jpg"), Some(want.clone()));
        assert_eq!(parse_filename("2011.02-12 _  The title of the Picture.Jpg"), Some(want));
    }

    #[test]
    fn test_date_time_title_pattern() {
        let want = expected(true);
        assert_eq!(parse_filename("2011-02.12 11:33-The title of the Picture.Jpg"), Some(want.clone()));
        assert_eq!(parse_filename("2011.02_12.11.33   The title of the Picture.Jpg"), Some(want.clone()));
        assert_eq!(parse_filename("2011 02 12 11:33  The title of the Picture.Jpg"), Some(want.clone()));
        assert_eq!(parse_filename("2011-02-12 1133 The title of the Picture.Jpg"), Some(want));
    }

    #[test]
    fn test_two_digit_year() {
        let info = parse_filename("11-02-12 party.jpg").unwrap();
        assert_eq!(info.year.as_deref(), Some("11"));
        assert_eq!(info.title.as_deref(), Some("party"));
    }

    #[test]
    fn test_month_name_pattern() {
        let info = parse_filename("june-09 Summer camp.jpeg").unwrap();
        assert_eq!(info.month_alpha.as_deref(), Some("june"));
        assert_eq!(info.year.as_deref(), Some("09"));
        assert_eq!(info.title.as_deref(), Some("Summer camp"));
        assert_eq!(info.extension.as_deref(), Some("jpeg"));

        // Month names are matched in lowercase only.
        let info = parse_filename("June-09 Summer camp.jpeg").unwrap();
        assert!(info.month_alpha.is_none());
        assert_eq!(info.title.as_deref(), Some("June-09 Summer camp"));
    }

    #[test]
    fn test_fallback_pattern() {
        let info = parse_filename("IMG_1234.JPG").unwrap();
        assert_eq!(info.title.as_deref(), Some("IMG_1234"));
        assert_eq!(info.extension.as_deref(), Some("JPG"));
        assert!(info.year.is_none());

        let info = parse_filename("archive.tar.gz").unwrap();
        assert_eq!(info.title.as_deref(), Some("archive.tar"));
        assert_eq!(info.extension.as_deref(), Some("gz"));
    }

    #[test]
    fn test_no_extension_fails() {
        assert!(parse_filename("README").is_none());
        assert!(parse_filename("").is_none());
    }

    #[test]
    fn test_parse_path_uses_file_name() {
        let info = parse_path(Path::new("/photos/2011-07-30 Lake.jpg")).unwrap();
        assert_eq!(info.day.as_deref(), Some("30"));
        assert_eq!(info.title.as_deref(), Some("Lake"));
    }

    #[test]
    fn test_title_keeps_decomposed_characters() {
        let name = "2011-07-30 Cafe\u{301}.jpg";
        let info = parse_filename(name).unwrap();
        assert_eq!(info.title.as_deref(), Some("Cafe\u{301}"));
        assert_ne!(info.title.as_deref(), Some("Caf\u{e9}"));
    }

    #[test]
    fn test_auto_generated_names() {
        assert!(looks_auto_generated("IMG_1234.JPG"));
        assert!(looks_auto_generated("P1040425.JPG"));
        assert!(looks_auto_generated("DSCF0042.jpg"));
        assert!(looks_auto_generated("2011-07-30 P0002394.JPG"));
        assert!(looks_auto_generated("20110725 123456.jpg"));
        assert!(!looks_auto_generated("2011-07-30 Lake at dusk.jpg"));
        assert!(!looks_auto_generated("Named image file.JPG"));
    }

    #[test]
    fn test_image_types() {
        assert!(is_jpeg_filename(Path::new("a.JPG")));
        assert!(is_jpeg_filename(Path::new("a.jpeg")));
        assert!(!is_jpeg_filename(Path::new("a.png")));
        assert!(is_image_filename(Path::new("a.png")));
        assert!(is_image_filename(Path::new("a.gif")));
        assert!(!is_image_filename(Path::new("Non Image File.txt")));
        assert!(!is_image_filename(Path::new("ImageDateStamperTest.pyc")));
    }
}
