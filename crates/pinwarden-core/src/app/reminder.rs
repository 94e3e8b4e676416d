//! ReminderAggregator - 期限切れ間近の pin を所有者ごとに 1 通にまとめる
//!
//! # フロー
//! 1. `now <= gc 日時 <= now + window` の upload を検索
//! 2. 所有者ごとに hash をまとめる
//! 3. directory で所有者を引き、メール無効の所有者は除外
//! 4. 残った所有者ごとに `ReminderMessage` を 1 つ生成
//!
//! directory の参照に失敗したら全体を中断する（reconciler と違い
//! 1 件単位の許容はしない）。

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use crate::domain::{ReminderMessage, render_digest};
use crate::ports::{Clock, DirectoryError, StoreError, UploadFilter, UploadStore, UserDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReminderError {
    #[error("reminder window of {0} days is out of range")]
    InvalidWindow(u32),

    #[error("failed to query expiring uploads: {0}")]
    Store(#[from] StoreError),

    #[error("directory lookup failed for {username}: {source}")]
    DirectoryLookup {
        username: String,
        #[source]
        source: DirectoryError,
    },
}

pub struct ReminderAggregator {
    store: Arc<dyn UploadStore>,
    directory: Arc<dyn UserDirectory>,
    clock: Arc<dyn Clock>,
}

impl ReminderAggregator {
    pub fn new(
        store: Arc<dyn UploadStore>,
        directory: Arc<dyn UserDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            directory,
            clock,
        }
    }

    pub async fn remind(&self, window_days: u32) -> Result<Vec<ReminderMessage>, ReminderError> {
        let from = self.clock.now();
        let until = from
            .checked_add_signed(Duration::days(i64::from(window_days)))
            .ok_or(ReminderError::InvalidWindow(window_days))?;
        let mut uploads = self
            .store
            .query(&UploadFilter::ExpiringBetween { from, until })
            .await?;
        uploads.sort_by_key(|u| u.garbage_collect_date);

        // 所有者 -> hash。BTreeMap で出力順を固定
        let mut hashes: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for upload in uploads {
            hashes.entry(upload.username).or_default().push(upload.hash);
        }

        let mut reminders = Vec::with_capacity(hashes.len());
        for (username, owned) in hashes {
            let user = self.directory.find_user(&username).await.map_err(|source| {
                ReminderError::DirectoryLookup {
                    username: username.clone(),
                    source,
                }
            })?;
            if !user.email_enabled {
                tracing::debug!(user = %username, "email disabled, no reminder");
                continue;
            }
            reminders.push(ReminderMessage {
                email_address: user.email_address,
                username: user.username,
                message: render_digest(window_days, &owned),
            });
        }
        tracing::info!(
            window_days,
            reminders = reminders.len(),
            "reminder aggregation complete"
        );
        Ok(reminders)
    }
}
