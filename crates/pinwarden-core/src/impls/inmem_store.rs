//! In-memory pin store: uploads, usage ledger and user directory behind one lock.
//!
//! Stands in for the service database in development and tests. Because all three
//! tables share a lock, `commit_expiry` is atomic here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{DirectoryEntry, Upload, UploadId, Usage};
use crate::ports::{
    CommitError, DirectoryError, ExpiryCommit, LedgerError, StoreError, UploadFilter, UploadStore,
    UsageLedger, UserDirectory,
};

/// In-memory state.
#[derive(Default)]
struct InMemoryPinState {
    /// Ownership records (single source of truth for pins).
    uploads: HashMap<UploadId, Upload>,

    /// Usage ledger keyed by username.
    usage: HashMap<String, Usage>,

    /// Directory keyed by username.
    users: HashMap<String, DirectoryEntry>,
}

impl InMemoryPinState {
    fn debit(&mut self, username: &str, bytes: u64) -> Result<(), LedgerError> {
        let usage = self
            .usage
            .get_mut(username)
            .ok_or_else(|| LedgerError::UnknownUser(username.to_string()))?;
        usage.debit(bytes);
        Ok(())
    }

    fn credit(&mut self, username: &str, bytes: u64) -> Result<(), LedgerError> {
        let usage = self
            .usage
            .get_mut(username)
            .ok_or_else(|| LedgerError::UnknownUser(username.to_string()))?;
        usage.credit(bytes);
        Ok(())
    }
}

/// In-memory implementation of `UploadStore`, `UsageLedger`, `UserDirectory` and
/// `ExpiryCommit`.
#[derive(Clone, Default)]
pub struct InMemoryPinStore {
    state: Arc<Mutex<InMemoryPinState>>,
}

impl InMemoryPinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_upload(&self, upload: Upload) {
        let mut state = self.state.lock().await;
        state.uploads.insert(upload.id, upload);
    }

    pub async fn insert_usage(&self, usage: Usage) {
        let mut state = self.state.lock().await;
        state.usage.insert(usage.username.clone(), usage);
    }

    pub async fn insert_user(&self, entry: DirectoryEntry) {
        let mut state = self.state.lock().await;
        state.users.insert(entry.username.clone(), entry);
    }

    pub async fn get_upload(&self, id: UploadId) -> Option<Upload> {
        let state = self.state.lock().await;
        state.uploads.get(&id).cloned()
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        let state = self.state.lock().await;
        state.uploads.values().cloned().collect()
    }

    pub async fn usage_entries(&self) -> Vec<Usage> {
        let state = self.state.lock().await;
        state.usage.values().cloned().collect()
    }

    pub async fn users(&self) -> Vec<DirectoryEntry> {
        let state = self.state.lock().await;
        state.users.values().cloned().collect()
    }
}

#[async_trait]
impl UploadStore for InMemoryPinStore {
    async fn query(&self, filter: &UploadFilter) -> Result<Vec<Upload>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .uploads
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn insert(&self, upload: Upload) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.uploads.contains_key(&upload.id) {
            return Err(StoreError::Duplicate(upload.id.to_string()));
        }
        state.uploads.insert(upload.id, upload);
        Ok(())
    }

    async fn delete(&self, id: UploadId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state
            .uploads
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn remove_pin(&self, username: &str, hash: &str, network: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let id = state
            .uploads
            .values()
            .find(|u| u.username == username && u.hash == hash && u.network == network)
            .map(|u| u.id)
            .ok_or_else(|| StoreError::NotFound(format!("{username}/{hash}@{network}")))?;
        state.uploads.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UsageLedger for InMemoryPinStore {
    async fn reduce_usage(&self, username: &str, bytes: u64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.debit(username, bytes)
    }

    async fn add_usage(&self, username: &str, bytes: u64) -> Result<(), LedgerError> {
        let mut state = self.state.lock().await;
        state.credit(username, bytes)
    }

    async fn find_usage(&self, username: &str) -> Result<Usage, LedgerError> {
        let state = self.state.lock().await;
        state
            .usage
            .get(username)
            .cloned()
            .ok_or_else(|| LedgerError::UnknownUser(username.to_string()))
    }
}

#[async_trait]
impl UserDirectory for InMemoryPinStore {
    async fn find_user(&self, username: &str) -> Result<DirectoryEntry, DirectoryError> {
        let state = self.state.lock().await;
        state
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(username.to_string()))
    }
}

#[async_trait]
impl ExpiryCommit for InMemoryPinStore {
    /// Existence check, debit and delete under one lock.
    async fn commit_expiry(&self, upload: &Upload, bytes: u64) -> Result<(), CommitError> {
        let mut state = self.state.lock().await;
        if !state.uploads.contains_key(&upload.id) {
            return Err(CommitError::AlreadyRemoved(upload.id.to_string()));
        }
        state
            .debit(&upload.username, bytes)
            .map_err(CommitError::UsageDebit)?;
        state.uploads.remove(&upload.id);
        Ok(())
    }
}
