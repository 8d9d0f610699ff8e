//! Typed documents and the key that matches them to remote entries.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::ValidationError;
use crate::manifest::{ManifestEntry, ManifestRecord};

/// Visual marker leading every key. Entries synced by earlier runs carry it
/// in their description, so it must not change.
pub const KEY_MARKER: &str = "📝";

/// Builds the remote description used as matching key.
pub fn entry_key(title: &str, date: &str) -> String {
    format!("{KEY_MARKER} {title} | {date}")
}

/// A validated manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    title: String,
    file: String,
    published: String,
}

impl Document {
    /// Validates the three required fields. When `date_format` is given, the
    /// date must parse as a date or date-time in that format.
    pub fn new(
        title: &str,
        file: &str,
        published: &str,
        date_format: Option<&str>,
    ) -> Result<Self, ValidationError> {
        require("title", title)?;
        require("file", file)?;
        require("time", published)?;
        if let Some(format) = date_format {
            check_date(published, format)?;
        }

        let doc = Self {
            title: title.to_string(),
            file: file.to_string(),
            published: published.to_string(),
        };
        if doc.filename().trim().is_empty() {
            return Err(ValidationError::EmptyField("file"));
        }
        Ok(doc)
    }

    pub fn from_entry(
        entry: &ManifestEntry,
        date_format: Option<&str>,
    ) -> Result<Self, ValidationError> {
        match entry {
            ManifestEntry::Record(record) => Self::from_record(record, date_format),
            ManifestEntry::Malformed { reason } => Err(ValidationError::Malformed(reason.clone())),
        }
    }

    pub fn from_record(
        record: &ManifestRecord,
        date_format: Option<&str>,
    ) -> Result<Self, ValidationError> {
        let title = record
            .title
            .as_deref()
            .ok_or(ValidationError::MissingField("title"))?;
        let file = record
            .file
            .as_deref()
            .ok_or(ValidationError::MissingField("file"))?;
        let time = record
            .time
            .as_deref()
            .ok_or(ValidationError::MissingField("time"))?;
        Self::new(title, file, time, date_format)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn published(&self) -> &str {
        &self.published
    }

    pub fn key(&self) -> String {
        entry_key(&self.title, &self.published)
    }

    /// File name used for a newly created entry: the last path segment.
    pub fn filename(&self) -> &str {
        self.file
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.file)
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

fn check_date(value: &str, format: &str) -> Result<(), ValidationError> {
    let parsed = NaiveDate::parse_from_str(value, format).is_ok()
        || NaiveDateTime::parse_from_str(value, format).is_ok();
    if parsed {
        Ok(())
    } else {
        Err(ValidationError::InvalidDate {
            value: value.to_string(),
            format: format.to_string(),
        })
    }
}
