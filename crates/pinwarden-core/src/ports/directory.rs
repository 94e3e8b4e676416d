//! UserDirectory port - ユーザー名 -> 連絡先

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::DirectoryEntry;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("user not found: {0}")]
    NotFound(String),

    #[error("directory backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user(&self, username: &str) -> Result<DirectoryEntry, DirectoryError>;
}
