//! EngineBuilder - コラボレータのワイヤリング
//!
//! # 学習ポイント
//! - Builder パターン
//! - 起動時検証（Fail-fast 設計）: 足りないコラボレータを build() で全部列挙する

use std::sync::Arc;

use crate::app::collector::Collector;
use crate::app::gc_loop::{GcLoop, LoopError};
use crate::app::notify::ReminderDispatcher;
use crate::app::reconciler::Reconciler;
use crate::app::recorder::PinRecorder;
use crate::app::refund::RefundHelper;
use crate::app::reminder::ReminderAggregator;
use crate::app::scanner::ExpirationScanner;
use crate::config::EngineConfig;
use crate::impls::InMemoryPinStore;
use crate::ports::{
    AuditSink, Clock, ContentSizeOracle, ExpiryCommit, IdGenerator, Mailer, SequentialCommit,
    SystemClock, UlidGenerator, UploadStore, UsageLedger, UserDirectory,
};

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing collaborators: {0:?}. These must be supplied before build().")]
    MissingCollaborators(Vec<&'static str>),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new()
///     .in_memory(store)
///     .oracle(Arc::new(oracle))
///     .mailer(Arc::new(LogMailer))
///     .audit(Arc::new(FileAuditSink::new("audit")))
///     .build()?;
/// ```
#[derive(Default)]
pub struct EngineBuilder {
    config: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    store: Option<Arc<dyn UploadStore>>,
    ledger: Option<Arc<dyn UsageLedger>>,
    directory: Option<Arc<dyn UserDirectory>>,
    commit: Option<Arc<dyn ExpiryCommit>>,
    oracle: Option<Arc<dyn ContentSizeOracle>>,
    mailer: Option<Arc<dyn Mailer>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// 省略時は `SystemClock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// 省略時はエンジンの clock を使う `UlidGenerator`
    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn store(mut self, store: Arc<dyn UploadStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// 省略時は ledger と store を順に呼ぶ `SequentialCommit`
    pub fn commit(mut self, commit: Arc<dyn ExpiryCommit>) -> Self {
        self.commit = Some(commit);
        self
    }

    /// store / ledger / directory / atomic commit をひとつの in-memory store でまかなう
    pub fn in_memory(self, store: InMemoryPinStore) -> Self {
        let shared = Arc::new(store);
        self.store(shared.clone())
            .ledger(shared.clone())
            .directory(shared.clone())
            .commit(shared)
    }

    pub fn oracle(mut self, oracle: Arc<dyn ContentSizeOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn build(self) -> Result<Engine, BuildError> {
        self.config.validate()?;

        let mut missing = Vec::new();
        if self.store.is_none() {
            missing.push("upload store");
        }
        if self.ledger.is_none() {
            missing.push("usage ledger");
        }
        if self.directory.is_none() {
            missing.push("user directory");
        }
        if self.oracle.is_none() {
            missing.push("content size oracle");
        }
        if self.mailer.is_none() {
            missing.push("mailer");
        }
        if self.audit.is_none() {
            missing.push("audit sink");
        }
        let (Some(store), Some(ledger), Some(directory), Some(oracle), Some(mailer), Some(audit)) = (
            self.store,
            self.ledger,
            self.directory,
            self.oracle,
            self.mailer,
            self.audit,
        ) else {
            return Err(BuildError::MissingCollaborators(missing));
        };

        let commit = self
            .commit
            .unwrap_or_else(|| Arc::new(SequentialCommit::new(ledger.clone(), store.clone())));
        let reconciler = Reconciler::new(oracle.clone(), commit);
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));
        Ok(Engine {
            config: self.config,
            clock,
            ids,
            store,
            ledger,
            directory,
            reconciler,
            oracle,
            mailer,
            audit,
        })
    }
}

/// ワイヤリング済みのエンジン。各コンポーネントを払い出す
pub struct Engine {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    store: Arc<dyn UploadStore>,
    ledger: Arc<dyn UsageLedger>,
    directory: Arc<dyn UserDirectory>,
    reconciler: Reconciler,
    oracle: Arc<dyn ContentSizeOracle>,
    mailer: Arc<dyn Mailer>,
    audit: Arc<dyn AuditSink>,
}

impl Engine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> Arc<dyn UsageLedger> {
        self.ledger.clone()
    }

    pub fn scanner(&self) -> ExpirationScanner {
        ExpirationScanner::new(self.store.clone(), self.clock.clone())
    }

    /// 払い出す reconciler（collector 経由も含む）は in-flight 集合を共有する
    pub fn reconciler(&self) -> Reconciler {
        self.reconciler.clone()
    }

    pub fn collector(&self) -> Collector {
        Collector::new(
            self.scanner(),
            self.reconciler(),
            self.audit.clone(),
            self.clock.clone(),
        )
    }

    pub fn gc_loop(&self) -> Result<GcLoop, LoopError> {
        GcLoop::new(self.collector(), self.config.gc.interval())
    }

    pub fn reminders(&self) -> ReminderAggregator {
        ReminderAggregator::new(self.store.clone(), self.directory.clone(), self.clock.clone())
    }

    pub fn dispatcher(&self) -> ReminderDispatcher {
        ReminderDispatcher::new(self.mailer.clone(), self.config.reminder.subject.clone())
    }

    pub fn refunds(&self) -> RefundHelper {
        RefundHelper::new(self.store.clone(), self.config.pin.network.clone())
    }

    pub fn recorder(&self) -> PinRecorder {
        PinRecorder::new(
            self.store.clone(),
            self.ledger.clone(),
            self.oracle.clone(),
            self.ids.clone(),
            self.clock.clone(),
            self.config.pin.network.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DirectoryEntry, Tier, Upload, UploadId, Usage};
    use crate::impls::{MemoryAuditSink, RecordingMailer, StaticContentOracle};
    use crate::ports::FixedClock;
    use chrono::{Duration, TimeZone, Utc};
    use ulid::Ulid;

    fn complete(store: InMemoryPinStore) -> EngineBuilder {
        EngineBuilder::new()
            .in_memory(store)
            .oracle(Arc::new(StaticContentOracle::new().with_content("h1", 64)))
            .mailer(Arc::new(RecordingMailer::new()))
            .audit(Arc::new(MemoryAuditSink::new()))
    }

    #[test]
    fn build_success() {
        assert!(complete(InMemoryPinStore::new()).build().is_ok());
    }

    #[test]
    fn build_reports_every_missing_collaborator() {
        let result = EngineBuilder::new()
            .oracle(Arc::new(StaticContentOracle::new()))
            .build();
        match result {
            Err(BuildError::MissingCollaborators(missing)) => assert_eq!(
                missing,
                vec!["upload store", "usage ledger", "user directory", "mailer", "audit sink"]
            ),
            other => panic!("expected MissingCollaborators, got {:?}", other.err()),
        }
    }

    #[test]
    fn build_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.gc.interval_secs = 0;
        let result = complete(InMemoryPinStore::new()).config(config).build();
        assert!(matches!(result, Err(BuildError::Config(_))));
    }

    /// u1 の pin は 1 時間前に期限切れ、u2 の pin は 30 分後に期限切れ
    #[tokio::test]
    async fn scan_and_remind_scenario() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let store = InMemoryPinStore::new();
        let u1 = Upload::new(UploadId::from_ulid(Ulid::new()), "h1", "u1", now - Duration::hours(1));
        let u2 = Upload::new(UploadId::from_ulid(Ulid::new()), "h2", "u2", now + Duration::minutes(30));
        store.insert_upload(u1.clone()).await;
        store.insert_upload(u2).await;
        store.insert_usage(Usage::new("u1", 100, Tier::Free)).await;
        store.insert_user(DirectoryEntry::new("u1", "u1@example.com", true)).await;
        store.insert_user(DirectoryEntry::new("u2", "u2@example.com", true)).await;

        let engine = complete(store)
            .clock(Arc::new(FixedClock::new(now)))
            .build()
            .unwrap();

        assert_eq!(engine.scanner().scan().await.unwrap(), vec![u1]);

        let reminders = engine.reminders().remind(1).await.unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].email_address, "u2@example.com");
        assert!(reminders[0].message.contains("h2"));
        assert!(!reminders[0].message.contains("h1"));

        let report = engine.dispatcher().dispatch(&reminders).await;
        assert!(report.all_sent());
    }

    #[tokio::test]
    async fn recorded_pin_is_collected_once_expired() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let store = InMemoryPinStore::new();
        store.insert_usage(Usage::new("u1", 0, Tier::Light)).await;
        let recording = complete(store.clone())
            .clock(Arc::new(FixedClock::new(now)))
            .build()
            .unwrap();
        let upload = recording.recorder().record("u1", "h1", 1).await.unwrap();
        assert_eq!(upload.network, "public");

        let later = complete(store.clone())
            .clock(Arc::new(FixedClock::new(now + Duration::days(2))))
            .build()
            .unwrap();
        let outcome = later.collector().collect_once().await.unwrap();

        assert_eq!(outcome.removed_count(), 1);
        assert!(store.uploads().await.is_empty());
        assert_eq!(store.find_usage("u1").await.unwrap().current_data_used, 0);
    }

    #[tokio::test]
    async fn default_commit_is_sequential_over_store_and_ledger() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let store = InMemoryPinStore::new();
        let up = Upload::new(UploadId::from_ulid(Ulid::new()), "h1", "u1", now - Duration::hours(1));
        store.insert_upload(up.clone()).await;
        store.insert_usage(Usage::new("u1", 100, Tier::Free)).await;
        let shared = Arc::new(store.clone());

        let engine = EngineBuilder::new()
            .store(shared.clone())
            .ledger(shared.clone())
            .directory(shared)
            .oracle(Arc::new(StaticContentOracle::new().with_content("h1", 64)))
            .mailer(Arc::new(RecordingMailer::new()))
            .audit(Arc::new(MemoryAuditSink::new()))
            .build()
            .unwrap();

        let report = engine.reconciler().reconcile(vec![up]).await;
        assert_eq!(report.bytes_debited(), 64);
        assert_eq!(
            engine.ledger().find_usage("u1").await.unwrap().current_data_used,
            36
        );
    }
}
