//! IdGenerator port - ID 生成
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース、タイムスタンプは `Clock` から取る

use crate::domain::ids::UploadId;
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は協調なしで発行できる ID を生成
pub trait IdGenerator: Send + Sync {
    fn generate_upload_id(&self) -> UploadId;
}

/// ULID 生成器
///
/// タイムスタンプ部は clock から取るので、`FixedClock` なら先頭部分が固定になる
/// （ランダム部は毎回異なる）
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_upload_id(&self) -> UploadId {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        UploadId::from(ulid)
    }
}
