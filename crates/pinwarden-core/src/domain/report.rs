//! reconcile と通知送信のバッチ結果
//!
//! 1 件単位の失敗はエラーではなくデータとして返す。呼び出し側はログではなく
//! report を見る。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::upload::Upload;

/// 期限切れ upload が残った（または途中までしか処理されなかった）理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// サイズ取得に失敗。何も変更していない
    StatFailed,
    /// usage の減算に失敗。レコードはそのまま
    UsageDebitFailed,
    /// usage は減算したがレコードを削除できなかった
    DeleteFailed,
    /// commit 前にレコードが消えた（競合した別の処理が先に削除）
    AlreadyRemoved,
    /// 別の処理がこのレコードを処理中
    InFlight,
}

impl SkipReason {
    /// 削除を伴わない減算が起きた
    pub fn is_anomaly(self) -> bool {
        matches!(self, SkipReason::DeleteFailed)
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::StatFailed => "stat failed",
            SkipReason::UsageDebitFailed => "usage debit failed",
            SkipReason::DeleteFailed => "delete failed",
            SkipReason::AlreadyRemoved => "already removed",
            SkipReason::InFlight => "in flight",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedUpload {
    pub upload: Upload,
    /// 所有者の usage から減算したバイト数
    pub bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedUpload {
    pub upload: Upload,
    pub reason: SkipReason,
    pub detail: String,
}

/// reconcile 1 回分の結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub removed: Vec<RemovedUpload>,
    pub skipped: Vec<SkippedUpload>,
}

impl ReconcileReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    /// 削除できた upload について減算したバイト数の合計
    pub fn bytes_debited(&self) -> u64 {
        self.removed.iter().map(|r| r.bytes).sum()
    }

    /// 減算したのにレコードが残った upload の数
    pub fn anomalies(&self) -> usize {
        self.skipped.iter().filter(|s| s.reason.is_anomaly()).count()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> impl Iterator<Item = &SkippedUpload> {
        self.skipped.iter().filter(move |s| s.reason == reason)
    }

    pub fn removed_uploads(&self) -> Vec<Upload> {
        self.removed.iter().map(|r| r.upload.clone()).collect()
    }
}

/// reminder を mailer に渡した結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// mailer が受け付けたユーザー名
    pub sent: Vec<String>,
    /// 拒否されたダイジェストごとの (ユーザー名, エラー)
    pub failed: Vec<(String, String)>,
}

impl DispatchReport {
    pub fn all_sent(&self) -> bool {
        self.failed.is_empty()
    }
}
