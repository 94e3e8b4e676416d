//! AuditSink port - 削除した upload の記録

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::Upload;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to write audit record {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("audit backend error: {0}")]
    Backend(String),
}

/// audit レコード 1 件（スケジューラ 1 回分）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub run: u64,
    pub timestamp: DateTime<Utc>,
    pub uploads: Vec<Upload>,
}

impl AuditRecord {
    /// upload ごとに key/value ブロック 1 つ、空行区切り
    pub fn render(&self) -> String {
        self.uploads
            .iter()
            .map(Upload::audit_block)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// audit レコードを永続化し、書き込み先を返す
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn persist(&self, record: &AuditRecord) -> Result<String, AuditError>;
}
