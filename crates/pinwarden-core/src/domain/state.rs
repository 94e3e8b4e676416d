//! スケジューラループの状態遷移

use serde::{Deserialize, Serialize};

/// ループの状態
///
/// 状態遷移:
/// - Idle -> Running（run 開始）
/// - Running -> Running（tick ごと）
/// - Running -> Stopped（キャンセル、または audit の致命的失敗）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum LoopState {
    /// 生成済み、未開始
    #[default]
    Idle,

    /// 次の tick かキャンセルを待っている
    Running,

    /// 終端
    Stopped,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LoopState::Stopped)
    }
}
