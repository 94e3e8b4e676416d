//! App - ports の上に組むエンジン本体
//!
//! # コンポーネント
//! - **ExpirationScanner**: gc 日時を過ぎた upload の検索
//! - **Reconciler**: stat → 減算 → 削除（失敗は 1 件単位でスキップ）
//! - **Collector**: scan + reconcile + audit を 1 回（dry run も）
//! - **GcLoop**: collector を定期実行（キャンセル可能）
//! - **ReminderAggregator** / **ReminderDispatcher**: 期限切れ予告のまとめとメール送信
//! - **RefundHelper**: store 経由で pin を 1 件外す
//! - **PinRecorder**: 保持期間つきで pin を登録
//! - **EngineBuilder**: ワイヤリング

pub mod builder;
pub mod collector;
pub mod gc_loop;
pub mod notify;
pub mod reconciler;
pub mod recorder;
pub mod refund;
pub mod reminder;
pub mod scanner;
pub mod status;

pub use self::builder::{BuildError, Engine, EngineBuilder};
pub use self::collector::{CollectError, CollectOutcome, Collector};
pub use self::gc_loop::{GcLoop, GcLoopHandle, LoopError};
pub use self::notify::ReminderDispatcher;
pub use self::reconciler::Reconciler;
pub use self::recorder::{PinRecorder, RecordError};
pub use self::refund::RefundHelper;
pub use self::reminder::{ReminderAggregator, ReminderError};
pub use self::scanner::{ExpirationScanner, ScanError};
pub use self::status::GcStatus;
