//! Status - スケジューラループが公開する進捗スナップショット

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::LoopState;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcStatus {
    pub state: LoopState,
    /// 期限切れを見つけた（= audit を書いた）tick の数
    pub runs: u64,
    pub removed_total: u64,
    /// 減算したのに削除できなかった upload の累計
    pub anomalies_total: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
}
