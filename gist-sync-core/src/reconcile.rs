//! Per-document reconciliation: validate, key, fetch, render, compare, write.
//!
//! Every document ends in exactly one terminal state (see [`ItemOutcome`]).
//! Failures never escape [`Reconciler::reconcile`]; they are returned in the
//! [`ItemReport`] so the runner can keep going.

use std::collections::HashMap;

use tracing::{error, info, warn};

use crate::config::RunOptions;
use crate::contract::{ContentFetcher, EntryDraft, RemoteEntry, RemoteStore};
use crate::document::Document;
use crate::error::ItemError;
use crate::index::RemoteIndex;
use crate::manifest::ManifestEntry;
use crate::render::render;
use crate::retry::fetch_with_retry;

/// Terminal state of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Created { entry_id: String },
    Updated { entry_id: String },
    Skipped { entry_id: String },
    Failed(ItemError),
}

impl ItemOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Created { .. } => "CREATE",
            ItemOutcome::Updated { .. } => "UPDATE",
            ItemOutcome::Skipped { .. } => "SKIP",
            ItemOutcome::Failed(_) => "FAIL",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ItemOutcome::Failed(_))
    }
}

/// What happened to one manifest record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemReport {
    /// 1-based position in the manifest.
    pub position: usize,
    pub title: Option<String>,
    /// Absent when the record failed validation.
    pub key: Option<String>,
    pub outcome: ItemOutcome,
}

/// The first document that claimed a key in this run.
struct Claim {
    position: usize,
    title: String,
    payload: String,
}

pub struct Reconciler<'a, S: ?Sized, F: ?Sized> {
    store: &'a S,
    fetcher: &'a F,
    options: &'a RunOptions,
    index: RemoteIndex,
    claims: HashMap<String, Claim>,
}

impl<'a, S, F> Reconciler<'a, S, F>
where
    S: RemoteStore + ?Sized,
    F: ContentFetcher + ?Sized,
{
    pub fn new(store: &'a S, fetcher: &'a F, options: &'a RunOptions, index: RemoteIndex) -> Self {
        Self {
            store,
            fetcher,
            options,
            index,
            claims: HashMap::new(),
        }
    }

    /// Current view of the remote store, including this run's writes.
    pub fn index(&self) -> &RemoteIndex {
        &self.index
    }

    pub fn into_index(self) -> RemoteIndex {
        self.index
    }

    pub async fn reconcile(&mut self, position: usize, entry: &ManifestEntry) -> ItemReport {
        let document = match Document::from_entry(entry, self.options.date_format.as_deref()) {
            Ok(document) => document,
            Err(e) => {
                let title = entry.title_hint().map(str::to_string);
                error!(
                    position,
                    title = title.as_deref().unwrap_or("<untitled>"),
                    kind = "validation",
                    error = %e,
                    "#{position} [FAIL] Invalid manifest record"
                );
                return ItemReport {
                    position,
                    title,
                    key: None,
                    outcome: ItemOutcome::Failed(e.into()),
                };
            }
        };

        let key = document.key();
        let outcome = match self.apply(position, &document, &key).await {
            Ok(outcome) => {
                info!(
                    position,
                    title = document.title(),
                    "#{position} [{}] {}",
                    outcome.label(),
                    document.title()
                );
                outcome
            }
            Err(e) => {
                error!(
                    position,
                    title = document.title(),
                    kind = e.kind(),
                    error = %e,
                    "#{position} [FAIL] {}",
                    document.title()
                );
                ItemOutcome::Failed(e)
            }
        };

        ItemReport {
            position,
            title: Some(document.title().to_string()),
            key: Some(key),
            outcome,
        }
    }

    async fn apply(
        &mut self,
        position: usize,
        document: &Document,
        key: &str,
    ) -> Result<ItemOutcome, ItemError> {
        let content = fetch_with_retry(self.fetcher, document.file(), &self.options.retry).await?;
        let payload = render(document.title(), document.published(), &content);

        if let Some(claim) = self.claims.get(key) {
            if claim.payload != payload {
                return Err(ItemError::Integrity {
                    key: key.to_string(),
                    first_position: claim.position,
                    first_title: claim.title.clone(),
                });
            }
            warn!(
                position,
                first_position = claim.position,
                key,
                "Manifest lists the same document twice"
            );
        }

        let existing = self
            .index
            .get(key)
            .map(|e| (e.entry_id.clone(), e.filename.clone(), e.content == payload));

        let outcome = match existing {
            None => {
                let draft = EntryDraft {
                    description: key.to_string(),
                    filename: document.filename().to_string(),
                    content: payload.clone(),
                };
                let entry_id = self.store.create_entry(&draft).await?;
                self.record_write(&entry_id, draft);
                ItemOutcome::Created { entry_id }
            }
            Some((entry_id, _, true)) => ItemOutcome::Skipped { entry_id },
            Some((entry_id, filename, false)) => {
                let filename = if filename.is_empty() {
                    document.filename().to_string()
                } else {
                    filename
                };
                let draft = EntryDraft {
                    description: key.to_string(),
                    filename,
                    content: payload.clone(),
                };
                self.store.update_entry(&entry_id, &draft).await?;
                self.record_write(&entry_id, draft);
                ItemOutcome::Updated { entry_id }
            }
        };

        self.claims.entry(key.to_string()).or_insert(Claim {
            position,
            title: document.title().to_string(),
            payload,
        });
        Ok(outcome)
    }

    fn record_write(&mut self, entry_id: &str, draft: EntryDraft) {
        self.index.upsert(RemoteEntry {
            entry_id: entry_id.to_string(),
            description: draft.description,
            filename: draft.filename,
            content: draft.content,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockContentFetcher, MockRemoteStore};
    use crate::document::entry_key;
    use crate::error::{FetchError, RemoteError, ValidationError};
    use crate::manifest::ManifestRecord;
    use crate::retry::RetryPolicy;

    fn options() -> RunOptions {
        RunOptions {
            retry: RetryPolicy::immediate(3),
            date_format: None,
        }
    }

    fn fetcher_returning(content: &'static str) -> MockContentFetcher {
        let mut fetcher = MockContentFetcher::new();
        fetcher
            .expect_fetch()
            .returning(move |_| Ok(content.to_string()));
        fetcher
    }

    fn record(title: &str, file: &str, time: &str) -> ManifestEntry {
        ManifestRecord::new(title, file, time).into()
    }

    #[tokio::test]
    async fn creates_missing_entry_with_key_as_description() {
        let mut store = MockRemoteStore::new();
        store
            .expect_create_entry()
            .withf(|draft| {
                draft.description == "📝 A | 2024-01-01"
                    && draft.filename == "a.md"
                    && draft.content.ends_with("alpha\n")
            })
            .times(1)
            .returning(|_| Ok("g1".to_string()));
        let fetcher = fetcher_returning("alpha");
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let report = reconciler
            .reconcile(1, &record("A", "posts/a.md", "2024-01-01"))
            .await;

        assert_eq!(
            report.outcome,
            ItemOutcome::Created {
                entry_id: "g1".into()
            }
        );
        let indexed = reconciler.index().get("📝 A | 2024-01-01").unwrap();
        assert_eq!(indexed.entry_id, "g1");
        assert!(indexed.content.ends_with("alpha\n"));
    }

    #[tokio::test]
    async fn skips_unchanged_entry_without_writing() {
        let key = entry_key("A", "2024-01-01");
        let index = RemoteIndex::from_entries(vec![RemoteEntry {
            entry_id: "g1".into(),
            description: key.clone(),
            filename: "a.md".into(),
            content: render("A", "2024-01-01", "alpha"),
        }]);
        let store = MockRemoteStore::new();
        let fetcher = fetcher_returning("alpha");
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, index);
        let report = reconciler.reconcile(1, &record("A", "a.md", "2024-01-01")).await;

        assert_eq!(
            report.outcome,
            ItemOutcome::Skipped {
                entry_id: "g1".into()
            }
        );
    }

    #[tokio::test]
    async fn updates_changed_entry_through_its_handle_and_filename() {
        let key = entry_key("A", "2024-01-01");
        let index = RemoteIndex::from_entries(vec![RemoteEntry {
            entry_id: "g1".into(),
            description: key.clone(),
            filename: "original-name.md".into(),
            content: render("A", "2024-01-01", "old"),
        }]);
        let mut store = MockRemoteStore::new();
        store
            .expect_update_entry()
            .withf(|id, draft| id.to_string() == "g1" && draft.filename == "original-name.md")
            .times(1)
            .returning(|_, _| Ok(()));
        let fetcher = fetcher_returning("new");
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, index);
        let report = reconciler.reconcile(1, &record("A", "a.md", "2024-01-01")).await;

        assert_eq!(
            report.outcome,
            ItemOutcome::Updated {
                entry_id: "g1".into()
            }
        );
        assert!(reconciler.index().get(&key).unwrap().content.ends_with("new\n"));
    }

    #[tokio::test]
    async fn invalid_record_never_touches_the_network() {
        let store = MockRemoteStore::new();
        let fetcher = MockContentFetcher::new();
        let options = options();
        let entry: ManifestEntry = ManifestRecord {
            title: Some("A".into()),
            file: None,
            time: Some("2024-01-01".into()),
        }
        .into();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let report = reconciler.reconcile(3, &entry).await;

        assert_eq!(report.key, None);
        assert_eq!(report.title.as_deref(), Some("A"));
        assert_eq!(
            report.outcome,
            ItemOutcome::Failed(ItemError::Validation(ValidationError::MissingField("file")))
        );
    }

    #[tokio::test]
    async fn fetch_failure_performs_no_write() {
        let store = MockRemoteStore::new();
        let mut fetcher = MockContentFetcher::new();
        fetcher.expect_fetch().returning(|reference| {
            Err(FetchError::NotFound {
                reference: reference.to_string(),
            })
        });
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let report = reconciler.reconcile(1, &record("A", "gone.md", "2024-01-01")).await;

        assert!(matches!(
            report.outcome,
            ItemOutcome::Failed(ItemError::Fetch(FetchError::NotFound { .. }))
        ));
    }

    #[tokio::test]
    async fn failed_create_leaves_index_untouched() {
        let mut store = MockRemoteStore::new();
        store.expect_create_entry().returning(|_| {
            Err(RemoteError::Api {
                status: 422,
                message: "Validation Failed".into(),
            })
        });
        let fetcher = fetcher_returning("alpha");
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let report = reconciler.reconcile(1, &record("A", "a.md", "2024-01-01")).await;

        assert!(matches!(
            report.outcome,
            ItemOutcome::Failed(ItemError::Remote(RemoteError::Api { status: 422, .. }))
        ));
        assert!(reconciler.index().is_empty());
    }

    #[tokio::test]
    async fn colliding_key_with_different_content_is_an_integrity_error() {
        let mut store = MockRemoteStore::new();
        store
            .expect_create_entry()
            .times(1)
            .returning(|_| Ok("g1".to_string()));
        let mut fetcher = MockContentFetcher::new();
        fetcher.expect_fetch().returning(|reference| {
            Ok(if reference.ends_with("first.md") {
                "first body".to_string()
            } else {
                "second body".to_string()
            })
        });
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let first = reconciler.reconcile(1, &record("Dup", "first.md", "2024-01-01")).await;
        let second = reconciler.reconcile(2, &record("Dup", "second.md", "2024-01-01")).await;

        assert!(matches!(first.outcome, ItemOutcome::Created { .. }));
        assert_eq!(
            second.outcome,
            ItemOutcome::Failed(ItemError::Integrity {
                key: entry_key("Dup", "2024-01-01"),
                first_position: 1,
                first_title: "Dup".into(),
            })
        );
        assert!(reconciler
            .index()
            .get(&entry_key("Dup", "2024-01-01"))
            .unwrap()
            .content
            .ends_with("first body\n"));
    }

    #[tokio::test]
    async fn repeated_identical_record_is_skipped() {
        let mut store = MockRemoteStore::new();
        store
            .expect_create_entry()
            .times(1)
            .returning(|_| Ok("g1".to_string()));
        let fetcher = fetcher_returning("same");
        let options = options();

        let mut reconciler = Reconciler::new(&store, &fetcher, &options, RemoteIndex::default());
        let entry = record("A", "a.md", "2024-01-01");
        let first = reconciler.reconcile(1, &entry).await;
        let second = reconciler.reconcile(2, &entry).await;

        assert!(matches!(first.outcome, ItemOutcome::Created { .. }));
        assert_eq!(
            second.outcome,
            ItemOutcome::Skipped {
                entry_id: "g1".into()
            }
        );
    }
}
