//! Upload - あるユーザーによるコンテンツ hash 1 つの pin

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::ids::UploadId;

/// 指定が無いときのネットワークタグ
pub const DEFAULT_NETWORK: &str = "public";

/// 所有 / pin レコード
///
/// (username, hash) の組がそれぞれ独立した pin。同じ hash を複数のユーザーが
/// それぞれの gc 日時で pin できる。1 件削除しても、コンテンツがまだ
/// 参照されているかどうかは分からない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upload {
    pub id: UploadId,
    pub hash: String,
    pub username: String,
    /// この時刻を過ぎたら回収してよい
    pub garbage_collect_date: DateTime<Utc>,
    #[serde(default = "default_network")]
    pub network: String,
}

fn default_network() -> String {
    DEFAULT_NETWORK.to_string()
}

impl Upload {
    pub fn new(
        id: UploadId,
        hash: impl Into<String>,
        username: impl Into<String>,
        garbage_collect_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            hash: hash.into(),
            username: username.into(),
            garbage_collect_date,
            network: default_network(),
        }
    }

    pub fn with_network(mut self, network: impl Into<String>) -> Self {
        self.network = network.into();
        self
    }

    /// gc 日時を厳密に過ぎている
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.garbage_collect_date < now
    }

    /// gc 日時が `[from, until]` の範囲内（両端を含む）
    pub fn expires_within(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> bool {
        self.garbage_collect_date >= from && self.garbage_collect_date <= until
    }

    /// audit ファイル用の key/value ブロック
    pub fn audit_block(&self) -> String {
        format!(
            "id: {}\nhash: {}\nusername: {}\nnetwork: {}\ngarbage_collect_date: {}\n",
            self.id,
            self.hash,
            self.username,
            self.network,
            self.garbage_collect_date
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;
    use ulid::Ulid;

    fn upload_at(gc: DateTime<Utc>) -> Upload {
        Upload::new(UploadId::from_ulid(Ulid::new()), "QmHash", "alice", gc)
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[rstest]
    #[case(Duration::seconds(-1), true)]
    #[case(Duration::zero(), false)]
    #[case(Duration::seconds(1), false)]
    fn expiry_is_strict(#[case] offset: Duration, #[case] expired: bool) {
        assert_eq!(upload_at(now() + offset).is_expired_at(now()), expired);
    }

    #[rstest]
    #[case(Duration::seconds(-1), false)]
    #[case(Duration::zero(), true)]
    #[case(Duration::days(1), true)]
    #[case(Duration::days(1) + Duration::seconds(1), false)]
    fn window_is_inclusive(#[case] offset: Duration, #[case] inside: bool) {
        let upload = upload_at(now() + offset);
        assert_eq!(upload.expires_within(now(), now() + Duration::days(1)), inside);
    }

    #[test]
    fn audit_block_lists_every_field() {
        let upload = upload_at(now()).with_network("private-net");
        let block = upload.audit_block();
        assert!(block.contains(&format!("id: {}", upload.id)));
        assert!(block.contains("hash: QmHash"));
        assert!(block.contains("username: alice"));
        assert!(block.contains("network: private-net"));
        assert!(block.contains("garbage_collect_date: 2024-01-01T12:00:00Z"));
    }

    #[test]
    fn network_defaults_to_public_when_missing() {
        let json = serde_json::json!({
            "id": Ulid::new().to_string(),
            "hash": "QmHash",
            "username": "alice",
            "garbage_collect_date": "2024-01-01T12:00:00Z",
        });
        let upload: Upload = serde_json::from_value(json).unwrap();
        assert_eq!(upload.network, DEFAULT_NETWORK);
    }
}
