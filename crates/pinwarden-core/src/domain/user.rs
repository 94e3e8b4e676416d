use serde::{Deserialize, Serialize};

/// pin 所有者の directory エントリ。エンジンからは読み取りのみ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub username: String,
    pub email_address: String,
    /// メール通知を受け取る設定
    pub email_enabled: bool,
}

impl DirectoryEntry {
    pub fn new(
        username: impl Into<String>,
        email_address: impl Into<String>,
        email_enabled: bool,
    ) -> Self {
        Self {
            username: username.into(),
            email_address: email_address.into(),
            email_enabled,
        }
    }
}
