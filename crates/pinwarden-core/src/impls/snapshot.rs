//! StateSnapshot - JSON image of the in-memory backends.
//!
//! Lets the CLI operate on a file instead of the service database and content store.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{InMemoryPinStore, StaticContentOracle};
use crate::domain::{DirectoryEntry, Upload, Usage};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read or write snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid snapshot json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateSnapshot {
    #[serde(default)]
    pub uploads: Vec<Upload>,
    #[serde(default)]
    pub usage: Vec<Usage>,
    #[serde(default)]
    pub users: Vec<DirectoryEntry>,
    /// hash -> cumulative size in bytes
    #[serde(default)]
    pub content: HashMap<String, u64>,
}

impl StateSnapshot {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }

    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let raw = serde_json::to_vec_pretty(self)?;
        tokio::fs::write(path, raw).await?;
        Ok(())
    }

    /// Build the backends described by this snapshot.
    pub async fn into_backends(self) -> (InMemoryPinStore, StaticContentOracle) {
        let store = InMemoryPinStore::new();
        for upload in self.uploads {
            store.insert_upload(upload).await;
        }
        for usage in self.usage {
            store.insert_usage(usage).await;
        }
        for user in self.users {
            store.insert_user(user).await;
        }
        (store, StaticContentOracle::from(self.content))
    }

    /// Capture the current state of the backends.
    pub async fn capture(store: &InMemoryPinStore, oracle: &StaticContentOracle) -> Self {
        let mut uploads = store.uploads().await;
        uploads.sort_by_key(|u| u.id);
        let mut usage = store.usage_entries().await;
        usage.sort_by(|a, b| a.username.cmp(&b.username));
        let mut users = store.users().await;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Self {
            uploads,
            usage,
            users,
            content: oracle.sizes().clone(),
        }
    }
}
