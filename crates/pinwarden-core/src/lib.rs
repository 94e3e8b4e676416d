//! pinwarden-core
//!
//! pinning サービス向けの pin ライフサイクル / ガベージコレクションエンジン
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（Upload, Usage, DirectoryEntry, ReminderMessage, バッチ結果）
//! - **ports**: 外部コラボレータの trait（UploadStore, UsageLedger, ContentSizeOracle, Mailer, ...）
//! - **app**: scanner, reconciler, collector, gc loop, reminder, refund, builder
//! - **impls**: 開発・CLI 用の in-memory / ファイルシステム実装
//! - **config**: TOML 設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
