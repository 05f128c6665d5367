use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A named slot of a [`FileInfo`], used to bind regex captures positionally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Year,
    Month,
    MonthAlpha,
    Day,
    Hour,
    Minute,
    Title,
    Extension,
}

/// Date and title information inferred for one image file.
///
/// Sources produce partial records which are merged with [`FileInfo::merge`];
/// [`FileInfo::normalized`] turns the merged record into its canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip)]
    pub month_alpha: Option<String>,
}

impl FileInfo {
    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let value = Some(value.into());
        match field {
            Field::Year => self.year = value,
            Field::Month => self.month = value,
            Field::MonthAlpha => self.month_alpha = value,
            Field::Day => self.day = value,
            Field::Hour => self.hour = value,
            Field::Minute => self.minute = value,
            Field::Title => self.title = value,
            Field::Extension => self.extension = value,
        }
    }

    /// Overwrite the date and time fields from a timestamp, unpadded.
    pub fn set_datetime(&mut self, dt: &NaiveDateTime) {
        self.year = Some(dt.year().to_string());
        self.month = Some(dt.month().to_string());
        self.day = Some(dt.day().to_string());
        self.hour = Some(dt.hour().to_string());
        self.minute = Some(dt.minute().to_string());
    }

    /// Overlay `other` onto `self`; fields set in `other` win.
    pub fn merge(&mut self, other: FileInfo) {
        fn overlay(dst: &mut Option<String>, src: Option<String>) {
            if src.is_some() {
                *dst = src;
            }
        }
        overlay(&mut self.year, other.year);
        overlay(&mut self.month, other.month);
        overlay(&mut self.month_alpha, other.month_alpha);
        overlay(&mut self.day, other.day);
        overlay(&mut self.hour, other.hour);
        overlay(&mut self.minute, other.minute);
        overlay(&mut self.title, other.title);
        overlay(&mut self.extension, other.extension);
    }

    pub fn is_empty(&self) -> bool {
        *self == FileInfo::default()
    }

    /// Canonical form: 4-digit year, 2-digit month/day/hour/minute, numeric
    /// month in place of a month name, lowercase extension.
    ///
    /// Returns `None` when `title` or `extension` is missing.
    pub fn normalized(mut self) -> Option<FileInfo> {
        if self.title.is_none() || self.extension.is_none() {
            return None;
        }
        if let Some(name) = self.month_alpha.take() {
            if let Some(month) = month_from_name(&name) {
                self.month = Some(month.to_string());
            }
        }
        self.year = self.year.map(|y| last_chars(&format!("20{y}"), 4));
        for slot in [&mut self.month, &mut self.day, &mut self.hour, &mut self.minute] {
            *slot = slot.take().map(|v| last_chars(&format!("0{v}"), 2));
        }
        self.extension = self.extension.map(|e| e.to_lowercase());
        Some(self)
    }
}

fn last_chars(s: &str, n: usize) -> String {
    let count = s.chars().count();
    s.chars().skip(count.saturating_sub(n)).collect()
}

/// Month number for an English month name or abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "jan" | "january" => 1,
        "feb" | "february" => 2,
        "mar" | "march" => 3,
        "apr" | "april" => 4,
        "may" => 5,
        "jun" | "june" => 6,
        "jul" | "july" => 7,
        "aug" | "august" => 8,
        "sep" | "sept" | "september" => 9,
        "oct" | "october" => 10,
        "nov" | "november" => 11,
        "dec" | "december" => 12,
        _ => return None,
    };
    Some(month)
}
