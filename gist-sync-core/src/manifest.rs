//! The manifest: an ordered JSON array of `{title, file, time}` records.
//!
//! The top-level shape is a hard contract (not an array => fatal). Individual
//! records are parsed one by one so that a single broken record only fails
//! its own document.

use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::ContentFetcher;
use crate::error::ManifestError;
use crate::retry::{fetch_with_retry, RetryPolicy};

/// One manifest record as written by the author. Fields are validated later,
/// when the record becomes a [`crate::document::Document`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ManifestRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

impl ManifestRecord {
    pub fn new(title: &str, file: &str, time: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            file: Some(file.to_string()),
            time: Some(time.to_string()),
        }
    }
}

/// A manifest element: either a record with the expected field types or
/// something that could not be read as one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Record(ManifestRecord),
    Malformed { reason: String },
}

impl ManifestEntry {
    /// Best-effort title for logs and reports, even for invalid records.
    pub fn title_hint(&self) -> Option<&str> {
        match self {
            ManifestEntry::Record(record) => record.title.as_deref(),
            ManifestEntry::Malformed { .. } => None,
        }
    }
}

impl From<ManifestRecord> for ManifestEntry {
    fn from(record: ManifestRecord) -> Self {
        ManifestEntry::Record(record)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { entries }
    }

    pub fn from_records(records: Vec<ManifestRecord>) -> Self {
        Self::new(records.into_iter().map(ManifestEntry::from).collect())
    }

    pub fn parse(text: &str) -> Result<Self, ManifestError> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        let serde_json::Value::Array(items) = value else {
            return Err(ManifestError::NotAnArray);
        };

        let entries = items
            .into_iter()
            .enumerate()
            .map(|(idx, item)| match serde_json::from_value::<ManifestRecord>(item) {
                Ok(record) => ManifestEntry::Record(record),
                Err(e) => {
                    debug!(position = idx + 1, error = %e, "Manifest element is not a valid record");
                    ManifestEntry::Malformed {
                        reason: e.to_string(),
                    }
                }
            })
            .collect();

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fetches the manifest through the same fetcher and retry policy as posts.
pub async fn load_manifest<F>(
    fetcher: &F,
    path: &str,
    retry: &RetryPolicy,
) -> Result<Manifest, ManifestError>
where
    F: ContentFetcher + ?Sized,
{
    info!(manifest = path, "[SYNC] Loading manifest");
    let text = fetch_with_retry(fetcher, path, retry).await.map_err(|e| {
        error!(manifest = path, error = %e, "[SYNC][ERROR] Failed to fetch manifest");
        e
    })?;
    let manifest = Manifest::parse(&text).map_err(|e| {
        error!(manifest = path, error = %e, "[SYNC][ERROR] Failed to parse manifest");
        e
    })?;
    info!(manifest = path, records = manifest.len(), "[SYNC] Manifest loaded");
    Ok(manifest)
}
