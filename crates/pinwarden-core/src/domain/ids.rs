//! ドメイン識別子（型安全な ID）
//!
//! ID は ULID を phantom type 付きの `Id<T>` で包んだもの。実装はひとつでも
//! `UploadId` を別種のレコードの ID と取り違えることはない。
//!
//! ## ULID の特徴
//! - 生成時刻でソート可能（先頭がタイムスタンプ）
//! - 協調なしで生成できる
//! - 128 bit（UUID と同じサイズ）

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use ulid::Ulid;

/// ID の種類ごとのマーカー trait
///
/// `Display` / `FromStr` で使う prefix（例: "upload-"）を提供
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリックな ID 型。`T` はコンパイル時にだけ存在する
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid id '{0}'")]
pub struct ParseIdError(String);

/// prefix 付きの表示形式と素の ULID の両方を受け付ける
impl<T: IdMarker> FromStr for Id<T> {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix(T::prefix()).unwrap_or(s);
        Ulid::from_string(raw)
            .map(Self::from_ulid)
            .map_err(|_| ParseIdError(s.to_string()))
    }
}

/// Upload（pin レコード）のマーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Upload {}

impl IdMarker for Upload {
    fn prefix() -> &'static str {
        "upload-"
    }
}

/// 所有レコード 1 件（あるユーザーによる hash 1 つの pin）の ID
pub type UploadId = Id<Upload>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_prefix() {
        let ulid = Ulid::new();
        let id = UploadId::from_ulid(ulid);
        assert_eq!(id.as_ulid(), ulid);
        assert!(id.to_string().starts_with("upload-"));
    }

    #[test]
    fn parses_prefixed_and_bare_forms() {
        let id = UploadId::from_ulid(Ulid::new());
        let prefixed: UploadId = id.to_string().parse().unwrap();
        let bare: UploadId = id.as_ulid().to_string().parse().unwrap();
        assert_eq!(prefixed, id);
        assert_eq!(bare, id);
        assert!("upload-nope".parse::<UploadId>().is_err());
    }

    #[test]
    fn serializes_as_plain_ulid_string() {
        let id = UploadId::from_ulid(Ulid::new());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_ulid()));
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = UploadId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = UploadId::from_ulid(Ulid::new());
        assert!(id1 < id2);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        assert_eq!(std::mem::size_of::<UploadId>(), std::mem::size_of::<Ulid>());
    }
}
