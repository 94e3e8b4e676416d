//! PinRecorder - 新しい pin の登録（サイズ取得 → usage 加算 → レコード保存）

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::domain::Upload;
use crate::ports::{
    Clock, ContentSizeOracle, IdGenerator, LedgerError, StatError, StoreError, UploadStore,
    UsageLedger,
};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid hold time: {0} days")]
    InvalidHoldTime(u32),

    #[error("failed to stat {hash}: {source}")]
    Stat {
        hash: String,
        #[source]
        source: StatError,
    },

    #[error("failed to credit usage: {0}")]
    Ledger(#[from] LedgerError),

    /// この pin の usage はすでに加算済み
    #[error("failed to store upload after crediting usage: {0}")]
    Store(#[from] StoreError),
}

pub struct PinRecorder {
    store: Arc<dyn UploadStore>,
    ledger: Arc<dyn UsageLedger>,
    oracle: Arc<dyn ContentSizeOracle>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    network: String,
}

impl PinRecorder {
    pub fn new(
        store: Arc<dyn UploadStore>,
        ledger: Arc<dyn UsageLedger>,
        oracle: Arc<dyn ContentSizeOracle>,
        ids: Arc<dyn IdGenerator>,
        clock: Arc<dyn Clock>,
        network: impl Into<String>,
    ) -> Self {
        Self {
            store,
            ledger,
            oracle,
            ids,
            clock,
            network: network.into(),
        }
    }

    /// `username` の `hash` を登録する。`hold_days` 日後に回収対象になる
    ///
    /// 所有者の usage エントリが必要。無ければ何も保存しない
    pub async fn record(
        &self,
        username: &str,
        hash: &str,
        hold_days: u32,
    ) -> Result<Upload, RecordError> {
        let garbage_collect_date = match hold_days {
            0 => None,
            days => self
                .clock
                .now()
                .checked_add_signed(Duration::days(i64::from(days))),
        }
        .ok_or(RecordError::InvalidHoldTime(hold_days))?;

        let bytes = self
            .oracle
            .stat(hash)
            .await
            .map_err(|source| RecordError::Stat {
                hash: hash.to_string(),
                source,
            })?;
        self.ledger.add_usage(username, bytes).await?;

        let upload = Upload::new(
            self.ids.generate_upload_id(),
            hash,
            username,
            garbage_collect_date,
        )
        .with_network(self.network.clone());
        self.store.insert(upload.clone()).await.inspect_err(|e| {
            tracing::error!(
                user = %username,
                hash = %hash,
                bytes,
                error = %e,
                "usage credited but upload record was not stored"
            );
        })?;
        tracing::info!(upload = %upload.id, user = %username, hash = %hash, bytes, "pin recorded");
        Ok(upload)
    }
}
