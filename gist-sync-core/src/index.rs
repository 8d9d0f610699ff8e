use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::contract::{RemoteEntry, RemoteStore};
use crate::error::RemoteError;

/// Snapshot of the remote store keyed by description.
///
/// Built once per run from a single listing. Afterwards it only changes
/// through the reconciler's own writes, so later documents in the same run
/// see what earlier ones created or updated.
#[derive(Debug, Clone, Default)]
pub struct RemoteIndex {
    entries: HashMap<String, RemoteEntry>,
}

impl RemoteIndex {
    /// Lists every remote entry once and indexes the described ones.
    pub async fn build<S>(store: &S) -> Result<Self, RemoteError>
    where
        S: RemoteStore + ?Sized,
    {
        let listed = store.list_entries().await?;
        let total = listed.len();
        let index = Self::from_entries(listed);
        info!(
            listed = total,
            indexed = index.len(),
            "[SYNC] Built remote index"
        );
        Ok(index)
    }

    /// Entries without a description are left out. When several entries
    /// share a description the first one listed wins.
    pub fn from_entries(entries: impl IntoIterator<Item = RemoteEntry>) -> Self {
        let mut map = HashMap::new();
        for entry in entries {
            if entry.description.trim().is_empty() {
                debug!(entry_id = %entry.entry_id, "Skipping remote entry without description");
                continue;
            }
            match map.entry(entry.description.clone()) {
                Entry::Occupied(existing) => {
                    let existing: &RemoteEntry = existing.get();
                    warn!(
                        description = %entry.description,
                        kept = %existing.entry_id,
                        ignored = %entry.entry_id,
                        "Duplicate remote description, keeping the first listed entry"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry);
                }
            }
        }
        Self { entries: map }
    }

    pub fn get(&self, key: &str) -> Option<&RemoteEntry> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn upsert(&mut self, entry: RemoteEntry) {
        self.entries.insert(entry.description.clone(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRemoteStore;

    fn entry(id: &str, description: &str, content: &str) -> RemoteEntry {
        RemoteEntry {
            entry_id: id.to_string(),
            description: description.to_string(),
            filename: "post.md".to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn undescribed_entries_are_invisible() {
        let index = RemoteIndex::from_entries(vec![
            entry("1", "📝 A | 2024-01-01", "a"),
            entry("2", "", "orphan"),
            entry("3", "   ", "orphan"),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("📝 A | 2024-01-01").unwrap().entry_id, "1");
    }

    #[test]
    fn first_listed_duplicate_wins() {
        let index = RemoteIndex::from_entries(vec![
            entry("newest", "dup", "new"),
            entry("older", "dup", "old"),
        ]);
        assert_eq!(index.get("dup").unwrap().entry_id, "newest");
    }

    #[test]
    fn upsert_replaces_by_description() {
        let mut index = RemoteIndex::from_entries(vec![entry("1", "k", "old")]);
        index.upsert(entry("1", "k", "new"));
        index.upsert(entry("2", "other", "x"));
        assert_eq!(index.get("k").unwrap().content, "new");
        assert_eq!(index.len(), 2);
    }

    #[tokio::test]
    async fn build_lists_exactly_once() {
        let mut store = MockRemoteStore::new();
        store
            .expect_list_entries()
            .times(1)
            .returning(|| Ok(vec![entry("1", "k", "c")]));

        let index = RemoteIndex::build(&store).await.unwrap();
        assert_eq!(index.len(), 1);
    }

    #[tokio::test]
    async fn build_propagates_listing_failure() {
        let mut store = MockRemoteStore::new();
        store.expect_list_entries().returning(|| {
            Err(RemoteError::Api {
                status: 401,
                message: "Bad credentials".into(),
            })
        });

        let err = RemoteIndex::build(&store).await.unwrap_err();
        assert!(matches!(err, RemoteError::Api { status: 401, .. }));
    }
}
