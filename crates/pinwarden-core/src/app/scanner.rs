//! ExpirationScanner - gc 日時を過ぎた upload の検索

use std::sync::Arc;

use thiserror::Error;

use crate::domain::Upload;
use crate::ports::{Clock, StoreError, UploadFilter, UploadStore};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    /// 正常系: 今回は回収対象なし
    #[error("no expired pins")]
    NoExpiredItems,

    #[error("failed to query expired uploads: {0}")]
    Store(#[from] StoreError),
}

impl ScanError {
    pub fn is_benign(&self) -> bool {
        matches!(self, ScanError::NoExpiredItems)
    }
}

pub struct ExpirationScanner {
    store: Arc<dyn UploadStore>,
    clock: Arc<dyn Clock>,
}

impl ExpirationScanner {
    pub fn new(store: Arc<dyn UploadStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// gc 日時 < now の upload をすべて返す（順序保証なし）
    ///
    /// 結果が空なら `Ok(vec![])` ではなく `ScanError::NoExpiredItems`
    pub async fn scan(&self) -> Result<Vec<Upload>, ScanError> {
        let now = self.clock.now();
        let uploads = self.store.query(&UploadFilter::ExpiredBefore(now)).await?;
        if uploads.is_empty() {
            return Err(ScanError::NoExpiredItems);
        }
        Ok(uploads)
    }
}
