//! Reconciler - 期限切れ upload ごとに stat → 減算 → 削除
//!
//! # フロー（upload ごとに独立）
//! 1. upload を claim（1 レコードにつき処理中は最大 1 つ）
//! 2. `ContentSizeOracle::stat()` で累積サイズを取得
//! 3. `ExpiryCommit::commit_expiry()` で所有者の usage を減算してレコードを削除
//!
//! 失敗した upload はスキップするだけで、バッチは必ず最後まで走り結果は
//! `ReconcileReport` で返す。コンテンツ自体は unpin しない（同じ hash を
//! 他のユーザーが持っている可能性がある）。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::{ReconcileReport, RemovedUpload, SkipReason, SkippedUpload, Upload, UploadId};
use crate::ports::{CommitError, ContentSizeOracle, ExpiryCommit};

/// clone 同士は in-flight 集合を共有する
#[derive(Clone)]
pub struct Reconciler {
    oracle: Arc<dyn ContentSizeOracle>,
    commit: Arc<dyn ExpiryCommit>,
    in_flight: Arc<Mutex<HashSet<UploadId>>>,
}

impl Reconciler {
    pub fn new(oracle: Arc<dyn ContentSizeOracle>, commit: Arc<dyn ExpiryCommit>) -> Self {
        Self {
            oracle,
            commit,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn reconcile(&self, uploads: Vec<Upload>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for upload in uploads {
            match self.reconcile_one(&upload).await {
                Ok(bytes) => {
                    tracing::debug!(
                        upload_id = %upload.id,
                        hash = %upload.hash,
                        user = %upload.username,
                        bytes,
                        "expired pin removed"
                    );
                    report.removed.push(RemovedUpload { upload, bytes });
                }
                Err((reason, detail)) => {
                    if reason.is_anomaly() {
                        tracing::error!(
                            upload_id = %upload.id,
                            hash = %upload.hash,
                            user = %upload.username,
                            error = %detail,
                            "usage debited but upload record could not be deleted"
                        );
                    } else {
                        tracing::warn!(
                            upload_id = %upload.id,
                            hash = %upload.hash,
                            user = %upload.username,
                            reason = %reason,
                            error = %detail,
                            "skipping expired pin"
                        );
                    }
                    report.skipped.push(SkippedUpload {
                        upload,
                        reason,
                        detail,
                    });
                }
            }
        }
        report
    }

    async fn reconcile_one(&self, upload: &Upload) -> Result<u64, (SkipReason, String)> {
        let Some(_claim) = Claim::acquire(&self.in_flight, upload.id) else {
            return Err((
                SkipReason::InFlight,
                format!("{} is being reconciled by another pass", upload.id),
            ));
        };

        let bytes = self
            .oracle
            .stat(&upload.hash)
            .await
            .map_err(|e| (SkipReason::StatFailed, e.to_string()))?;

        self.commit
            .commit_expiry(upload, bytes)
            .await
            .map_err(|e| match e {
                CommitError::UsageDebit(err) => (SkipReason::UsageDebitFailed, err.to_string()),
                CommitError::DeleteAfterDebit(err) => (SkipReason::DeleteFailed, err.to_string()),
                CommitError::AlreadyRemoved(id) => (SkipReason::AlreadyRemoved, id),
            })?;
        Ok(bytes)
    }
}

/// in-flight 集合への登録。drop で解除
struct Claim {
    set: Arc<Mutex<HashSet<UploadId>>>,
    id: UploadId,
}

impl Claim {
    fn acquire(set: &Arc<Mutex<HashSet<UploadId>>>, id: UploadId) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        inserted.then(|| Self {
            set: Arc::clone(set),
            id,
        })
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
