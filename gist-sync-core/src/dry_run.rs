use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use crate::contract::{EntryDraft, RemoteEntry, RemoteStore};
use crate::error::RemoteError;

/// A write the dry run would have issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedWrite {
    Create { description: String },
    Update { entry_id: String, description: String },
}

/// Lists through to the wrapped store but only records writes.
///
/// Created entries get a synthetic `dry-run-<uuid>` handle so the rest of the
/// run behaves as if the write had happened.
pub struct DryRunStore<S> {
    inner: S,
    planned: Mutex<Vec<PlannedWrite>>,
}

impl<S> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    pub fn planned(&self) -> Vec<PlannedWrite> {
        self.planned
            .lock()
            .map(|planned| planned.clone())
            .unwrap_or_default()
    }

    fn plan(&self, write: PlannedWrite) {
        if let Ok(mut planned) = self.planned.lock() {
            planned.push(write);
        }
    }
}

#[async_trait]
impl<S> RemoteStore for DryRunStore<S>
where
    S: RemoteStore,
{
    async fn list_entries(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        self.inner.list_entries().await
    }

    async fn create_entry(&self, draft: &EntryDraft) -> Result<String, RemoteError> {
        info!(description = %draft.description, "[dry-run] would create entry");
        self.plan(PlannedWrite::Create {
            description: draft.description.clone(),
        });
        Ok(format!("dry-run-{}", Uuid::new_v4()))
    }

    async fn update_entry(&self, entry_id: &str, draft: &EntryDraft) -> Result<(), RemoteError> {
        info!(entry_id, description = %draft.description, "[dry-run] would update entry");
        self.plan(PlannedWrite::Update {
            entry_id: entry_id.to_string(),
            description: draft.description.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRemoteStore;

    fn draft(description: &str) -> EntryDraft {
        EntryDraft {
            description: description.to_string(),
            filename: "a.md".to_string(),
            content: "body".to_string(),
        }
    }

    #[tokio::test]
    async fn writes_never_reach_the_inner_store() {
        let mut inner = MockRemoteStore::new();
        inner.expect_list_entries().times(1).returning(|| Ok(vec![]));
        inner.expect_create_entry().never();
        inner.expect_update_entry().never();

        let store = DryRunStore::new(inner);
        assert!(store.list_entries().await.unwrap().is_empty());
        let id = store.create_entry(&draft("new")).await.unwrap();
        store.update_entry("g7", &draft("old")).await.unwrap();

        assert!(id.starts_with("dry-run-"));
        assert_eq!(
            store.planned(),
            vec![
                PlannedWrite::Create {
                    description: "new".into()
                },
                PlannedWrite::Update {
                    entry_id: "g7".into(),
                    description: "old".into()
                },
            ]
        );
    }
}
