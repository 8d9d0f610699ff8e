//! # contract: the seams between the reconciler and the outside world
//!
//! Two traits, both async and mockable:
//! - [`RemoteStore`] lists, creates and updates entries in a paste/snippet
//!   store (GitHub Gists in the binary crate, in-memory fakes in tests).
//! - [`ContentFetcher`] resolves a manifest reference to raw text.
//!
//! ## Mocking & Testing
//! - Both traits are annotated for `mockall`; the mocks are exported under
//!   the default `test-export-mocks` feature so downstream crates can use them.

use async_trait::async_trait;
use mockall::automock;

use crate::error::{FetchError, RemoteError};

/// One entry as currently held by the remote store.
///
/// The store may hold several files per entry; only the first one is
/// considered here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Opaque handle used to address the entry on update.
    pub entry_id: String,
    /// Remote-side description, used as the matching key. Empty when unset.
    pub description: String,
    pub filename: String,
    pub content: String,
}

/// Everything needed to write one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub description: String,
    pub filename: String,
    pub content: String,
}

/// Trait for listing and writing entries in the remote store.
///
/// Implementations should treat every call as potentially rate-limited and
/// report failures instead of panicking. A call either fully applies or
/// returns an error.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List every entry visible to the authenticated user, with content.
    async fn list_entries(&self) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Create a new entry and return its handle.
    async fn create_entry(&self, draft: &EntryDraft) -> Result<String, RemoteError>;

    /// Replace description and content of the entry addressed by `entry_id`.
    async fn update_entry(&self, entry_id: &str, draft: &EntryDraft) -> Result<(), RemoteError>;
}

/// Trait for resolving a document reference (path or URL) to its text.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetch the raw content behind `reference`. Empty content is an error.
    async fn fetch(&self, reference: &str) -> Result<String, FetchError>;
}
