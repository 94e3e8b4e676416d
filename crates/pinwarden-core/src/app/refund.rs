//! RefundHelper - store の "remove pin" 経由でユーザーの pin を 1 件外す

use std::sync::Arc;

use crate::ports::{StoreError, UploadStore};

pub struct RefundHelper {
    store: Arc<dyn UploadStore>,
    network: String,
}

impl RefundHelper {
    pub fn new(store: Arc<dyn UploadStore>, network: impl Into<String>) -> Self {
        Self {
            store,
            network: network.into(),
        }
    }

    /// `hash` が空なら何もせず成功（コラボレータは呼ばない）
    /// store のエラーはそのまま返す
    pub async fn remove_and_refund(&self, username: &str, hash: &str) -> Result<(), StoreError> {
        if hash.is_empty() {
            return Ok(());
        }
        self.store.remove_pin(username, hash, &self.network).await
    }
}
