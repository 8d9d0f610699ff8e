#![allow(dead_code)]

use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use gist_sync_core::contract::{EntryDraft, RemoteEntry, RemoteStore};
use gist_sync_core::error::RemoteError;

/// In-memory gist store that counts writes.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    entries: Vec<RemoteEntry>,
    next_id: usize,
    lists: usize,
    creates: usize,
    updates: usize,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<RemoteEntry>) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().entries = entries;
        store
    }

    pub fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }

    pub fn entries(&self) -> Vec<RemoteEntry> {
        self.state.lock().unwrap().entries.clone()
    }

    pub fn creates(&self) -> usize {
        self.state.lock().unwrap().creates
    }

    pub fn updates(&self) -> usize {
        self.state.lock().unwrap().updates
    }

    pub fn writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.creates + state.updates
    }

    pub fn lists(&self) -> usize {
        self.state.lock().unwrap().lists
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_entries(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.lists += 1;
        Ok(state.entries.clone())
    }

    async fn create_entry(&self, draft: &EntryDraft) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(RemoteError::Api {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }
        state.next_id += 1;
        state.creates += 1;
        let entry_id = format!("gist-{}", state.next_id);
        state.entries.push(RemoteEntry {
            entry_id: entry_id.clone(),
            description: draft.description.clone(),
            filename: draft.filename.clone(),
            content: draft.content.clone(),
        });
        Ok(entry_id)
    }

    async fn update_entry(&self, entry_id: &str, draft: &EntryDraft) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(RemoteError::Api {
                status: 500,
                message: "Internal Server Error".into(),
            });
        }
        state.updates += 1;
        let entry = state
            .entries
            .iter_mut()
            .find(|e| e.entry_id == entry_id)
            .ok_or_else(|| RemoteError::Api {
                status: 404,
                message: "Not Found".into(),
            })?;
        entry.description = draft.description.clone();
        entry.filename = draft.filename.clone();
        entry.content = draft.content.clone();
        Ok(())
    }
}

pub fn write_post(root: &Path, file: &str, content: &str) {
    let path = root.join(file);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}
