//! ExpiryCommit port - 減算 + 削除をひとまとまりで
//!
//! # 実装
//! - **SequentialCommit**: ledger で減算してから store で削除（アトミックではない）
//! - `InMemoryPinStore` はひとつのロックの下で両方を行う

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Upload;
use crate::ports::{LedgerError, StoreError, UploadStore, UsageLedger};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    /// 何も変わっていない
    #[error("usage debit failed: {0}")]
    UsageDebit(LedgerError),

    /// usage は減算済み、レコードは残っている
    #[error("delete failed after debit: {0}")]
    DeleteAfterDebit(StoreError),

    /// 減算前にレコードが消えていた
    #[error("upload already removed: {0}")]
    AlreadyRemoved(String),
}

/// upload 1 件の期限切れを確定する: 所有者から `bytes` を減算してレコードを削除
///
/// 可能な実装は all-or-nothing にすること。競合した 2 回目の処理は
/// 二重に減算せず `AlreadyRemoved` になる
#[async_trait]
pub trait ExpiryCommit: Send + Sync {
    async fn commit_expiry(&self, upload: &Upload, bytes: u64) -> Result<(), CommitError>;
}

/// 独立した 2 つのコラボレータを順に呼ぶ: 先に減算、次に削除
///
/// ここで削除に失敗すると減算済みのレコードが残る（`DeleteAfterDebit`）
pub struct SequentialCommit {
    ledger: Arc<dyn UsageLedger>,
    store: Arc<dyn UploadStore>,
}

impl SequentialCommit {
    pub fn new(ledger: Arc<dyn UsageLedger>, store: Arc<dyn UploadStore>) -> Self {
        Self { ledger, store }
    }
}

#[async_trait]
impl ExpiryCommit for SequentialCommit {
    async fn commit_expiry(&self, upload: &Upload, bytes: u64) -> Result<(), CommitError> {
        self.ledger
            .reduce_usage(&upload.username, bytes)
            .await
            .map_err(CommitError::UsageDebit)?;
        self.store
            .delete(upload.id)
            .await
            .map_err(CommitError::DeleteAfterDebit)
    }
}
