//! UploadStore port - 所有（pin）レコード

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Upload, UploadId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("upload not found: {0}")]
    NotFound(String),

    #[error("upload already exists: {0}")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

/// upload の検索条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadFilter {
    /// `garbage_collect_date < cutoff`
    ExpiredBefore(DateTime<Utc>),

    /// `from <= garbage_collect_date <= until`
    ExpiringBetween {
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    },

    /// ある所有者の upload すべて
    OwnedBy(String),
}

impl UploadFilter {
    pub fn matches(&self, upload: &Upload) -> bool {
        match self {
            UploadFilter::ExpiredBefore(cutoff) => upload.is_expired_at(*cutoff),
            UploadFilter::ExpiringBetween { from, until } => upload.expires_within(*from, *until),
            UploadFilter::OwnedBy(username) => upload.username == *username,
        }
    }
}

/// 所有レコードのストア
///
/// # 設計
/// - レコード削除は帳簿上だけ。コンテンツはコンテンツストアに pin されたまま
/// - `remove_pin` は refund が使う外部の "pin を外す" 経路
#[async_trait]
pub trait UploadStore: Send + Sync {
    async fn query(&self, filter: &UploadFilter) -> Result<Vec<Upload>, StoreError>;

    async fn insert(&self, upload: Upload) -> Result<(), StoreError>;

    async fn delete(&self, id: UploadId) -> Result<(), StoreError>;

    async fn remove_pin(&self, username: &str, hash: &str, network: &str) -> Result<(), StoreError>;
}
