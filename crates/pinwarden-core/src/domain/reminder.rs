//! ReminderMessage - 期限切れ間近の pin を所有者ごとにまとめたダイジェスト

use serde::{Deserialize, Serialize};

/// ダイジェストの content type
pub const DIGEST_CONTENT_TYPE: &str = "text/html";

/// ある所有者の期限切れ間近の hash をまとめたもの
///
/// 所有者ごとに 1 通。pin ごとには送らない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderMessage {
    pub email_address: String,
    pub username: String,
    pub message: String,
}

/// `window_days` 以内に期限切れになる `hashes` の本文を生成
pub fn render_digest<S: AsRef<str>>(window_days: u32, hashes: &[S]) -> String {
    let mut list = String::from("<ul>");
    for hash in hashes {
        list.push_str("<li>");
        list.push_str(hash.as_ref());
        list.push_str("</li>");
    }
    list.push_str("</ul>");
    format!(
        "The following hashes you have uploaded will be removed from the system within the next {window_days} days, \
         please extend your pin soon or they will be removed <br>{list}"
    )
}
