//! UsageLedger port - ユーザーごとの使用バイト数の管理

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::Usage;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no usage entry for user {0}")]
    UnknownUser(String),

    #[error("ledger backend error: {0}")]
    Backend(String),
}

/// システムの他の部分（クレジット、新規 pin）と共有するので排他アクセスは前提にしない
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// `username` から `bytes` を減算
    async fn reduce_usage(&self, username: &str, bytes: u64) -> Result<(), LedgerError>;

    /// `username` に `bytes` を加算（新規 pin）
    async fn add_usage(&self, username: &str, bytes: u64) -> Result<(), LedgerError>;

    async fn find_usage(&self, username: &str) -> Result<Usage, LedgerError>;
}
