//! Usage - ユーザーごとの使用バイト数

use serde::{Deserialize, Serialize};
use std::fmt;

/// バイト数と一緒に持つアカウント種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Light,
    Plus,
    Partner,
    Paid,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Free => "free",
            Tier::Light => "light",
            Tier::Plus => "plus",
            Tier::Partner => "partner",
            Tier::Paid => "paid",
        };
        f.write_str(name)
    }
}

/// 1 ユーザー分のバイトカウンタ
///
/// GC では減算、pin 登録では加算する。エントリの作成は外部で行う
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub username: String,
    pub current_data_used: u64,
    #[serde(default)]
    pub tier: Tier,
}

impl Usage {
    pub fn new(username: impl Into<String>, current_data_used: u64, tier: Tier) -> Self {
        Self {
            username: username.into(),
            current_data_used,
            tier,
        }
    }

    pub fn credit(&mut self, bytes: u64) {
        self.current_data_used = self.current_data_used.saturating_add(bytes);
    }

    /// カウンタを減らす（0 で止まる）
    pub fn debit(&mut self, bytes: u64) {
        self.current_data_used = self.current_data_used.saturating_sub(bytes);
    }
}
