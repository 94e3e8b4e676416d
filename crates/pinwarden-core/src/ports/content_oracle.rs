//! ContentSizeOracle port - コンテンツストアの "stat"

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatError {
    #[error("content not found: {0}")]
    NotFound(String),

    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

/// コンテンツ hash から累積サイズ（バイト）を引く
///
/// 読み取りだけ。この port 経由でコンテンツを unpin することはない
#[async_trait]
pub trait ContentSizeOracle: Send + Sync {
    async fn stat(&self, hash: &str) -> Result<u64, StatError>;
}
