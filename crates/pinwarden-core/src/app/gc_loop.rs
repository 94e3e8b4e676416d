//! GcLoop - pin の定期ガベージコレクション
//!
//! # フロー（tick ごと）
//! 1. `ExpirationScanner::scan()`（期限切れなしは 0 件扱い、エラーではない）
//! 2. 結果に対して `Reconciler::reconcile()`
//! 3. この tick で削除できた upload だけを audit に記録
//!
//! キャンセルは `watch` チャネル経由で、tick の合間にだけ見る。始まった tick は
//! 最後まで走る。致命的なのは audit の失敗だけ。

use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval_at};

use crate::app::collector::{CollectOutcome, Collector};
use crate::app::status::GcStatus;
use crate::domain::LoopState;
use crate::ports::AuditError;

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("audit persistence failed after removing {removed_total} pins: {source}")]
    AuditPersist {
        /// 失敗までに削除した件数（失敗した tick の分も含む）
        removed_total: u64,
        #[source]
        source: AuditError,
    },

    #[error("gc interval must be greater than zero")]
    InvalidInterval,

    #[error("gc loop task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub struct GcLoop {
    collector: Collector,
    interval: Duration,
    removed_total: u64,
    status_tx: watch::Sender<GcStatus>,
}

impl GcLoop {
    /// `interval` が 0 なら `LoopError::InvalidInterval`
    pub fn new(collector: Collector, interval: Duration) -> Result<Self, LoopError> {
        if interval.is_zero() {
            return Err(LoopError::InvalidInterval);
        }
        let (status_tx, _) = watch::channel(GcStatus::default());
        Ok(Self {
            collector,
            interval,
            removed_total: 0,
            status_tx,
        })
    }

    /// status の購読（状態遷移と tick ごとのカウンタ）
    pub fn status(&self) -> watch::Receiver<GcStatus> {
        self.status_tx.subscribe()
    }

    pub fn state(&self) -> LoopState {
        self.status_tx.borrow().state
    }

    /// `shutdown` が `true` になる（または sender が drop される）まで実行
    ///
    /// 戻り値は削除した pin の累計
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<u64, LoopError> {
        self.set_state(LoopState::Running);
        tracing::info!(interval_secs = self.interval.as_secs(), "starting pin expiration service");

        // 最初の tick は即時ではなく 1 interval 後
        let mut ticker = interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // sender が drop された
                        break;
                    }
                    continue;
                }
                _ = ticker.tick() => {
                    if let Err(source) = self.tick().await {
                        self.set_state(LoopState::Stopped);
                        return Err(LoopError::AuditPersist {
                            removed_total: self.removed_total,
                            source,
                        });
                    }
                }
            }
        }

        self.set_state(LoopState::Stopped);
        tracing::info!(removed_total = self.removed_total, "pin expiration service stopped");
        Ok(self.removed_total)
    }

    /// `run` を runtime 上に spawn
    pub fn spawn(self) -> GcLoopHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let status = self.status();
        let join = tokio::spawn(self.run(shutdown_rx));
        GcLoopHandle {
            shutdown_tx,
            status,
            join,
        }
    }

    async fn tick(&mut self) -> Result<(), AuditError> {
        let outcome = self.collector.collect_once().await;
        // audit に失敗しても削除自体は済んでいるので数える
        let (removed, anomalies, audited) = match &outcome {
            Ok(CollectOutcome::Collected { report, .. }) => {
                (report.removed_count(), report.anomalies(), true)
            }
            Ok(_) => (0, 0, false),
            Err(e) => (e.report.removed_count(), e.report.anomalies(), false),
        };
        self.removed_total += removed as u64;
        let removed_total = self.removed_total;
        let now = self.collector.now();
        self.status_tx.send_modify(|s| {
            s.removed_total = removed_total;
            s.anomalies_total += anomalies as u64;
            s.runs += u64::from(audited);
            s.last_tick_at = Some(now);
        });
        outcome.map(|_| ()).map_err(|e| e.source)
    }

    fn set_state(&self, state: LoopState) {
        self.status_tx.send_modify(|s| s.state = state);
    }
}

/// spawn した `GcLoop` のハンドル
/// - ハンドルを drop すると shutdown sender も drop され、ループは止まる
/// - `shutdown_and_join()` で停止して累計を受け取る
pub struct GcLoopHandle {
    shutdown_tx: watch::Sender<bool>,
    status: watch::Receiver<GcStatus>,
    join: JoinHandle<Result<u64, LoopError>>,
}

impl GcLoopHandle {
    /// 次の tick の境目で止まるよう要求
    pub fn request_shutdown(&self) {
        // ループ停止済みなら receiver はもう無い
        let _ = self.shutdown_tx.send(true);
    }

    pub fn status(&self) -> GcStatus {
        self.status.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// ハンドルを消費せずにループの終了を待つ
    ///
    /// cancel safe なので `select!` で停止トリガと並べられる。これが返った後は
    /// `join` / `shutdown_and_join` を呼ばないこと
    pub async fn wait(&mut self) -> Result<u64, LoopError> {
        (&mut self.join).await?
    }

    pub async fn shutdown_and_join(self) -> Result<u64, LoopError> {
        self.request_shutdown();
        self.join.await?
    }

    /// ループが自分で終わるのを待つ（致命的エラー、または外部からの停止）
    pub async fn join(self) -> Result<u64, LoopError> {
        self.join.await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::reconciler::Reconciler;
    use crate::app::scanner::ExpirationScanner;
    use crate::domain::{Tier, Upload, UploadId, Usage};
    use crate::impls::{InMemoryPinStore, MemoryAuditSink, StaticContentOracle};
    use crate::ports::{
        AuditRecord, AuditSink, Clock, ContentSizeOracle, FixedClock, StatError, UsageLedger,
    };
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use std::sync::Arc;
    use tokio::sync::Notify;
    use ulid::Ulid;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn expired(user: &str, hash: &str) -> Upload {
        Upload::new(
            UploadId::from_ulid(Ulid::new()),
            hash,
            user,
            now() - chrono::Duration::hours(1),
        )
    }

    fn gc_loop(store: &InMemoryPinStore, audit: Arc<dyn AuditSink>) -> GcLoop {
        let oracle = StaticContentOracle::new()
            .with_content("QmA", 10)
            .with_content("QmB", 20);
        gc_loop_with_oracle(store, Arc::new(oracle), audit)
    }

    fn collector(
        store: &InMemoryPinStore,
        oracle: Arc<dyn ContentSizeOracle>,
        audit: Arc<dyn AuditSink>,
    ) -> Collector {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        Collector::new(
            ExpirationScanner::new(Arc::new(store.clone()), clock.clone()),
            Reconciler::new(oracle, Arc::new(store.clone())),
            audit,
            clock,
        )
    }

    fn gc_loop_with_oracle(
        store: &InMemoryPinStore,
        oracle: Arc<dyn ContentSizeOracle>,
        audit: Arc<dyn AuditSink>,
    ) -> GcLoop {
        GcLoop::new(collector(store, oracle, audit), INTERVAL).unwrap()
    }

    async fn store_with_usage() -> InMemoryPinStore {
        let store = InMemoryPinStore::new();
        store.insert_usage(Usage::new("u1", 1_000, Tier::Paid)).await;
        store
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_first_tick_returns_zero() {
        let store = store_with_usage().await;
        store.insert_upload(expired("u1", "QmA")).await;
        let audit = MemoryAuditSink::new();
        let handle = gc_loop(&store, Arc::new(audit.clone())).spawn();

        let total = handle.shutdown_and_join().await.unwrap();

        assert_eq!(total, 0);
        assert!(audit.records().await.is_empty());
        assert_eq!(store.uploads().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn total_is_sum_of_ticks() {
        let store = store_with_usage().await;
        store.insert_upload(expired("u1", "QmA")).await;
        let audit = MemoryAuditSink::new();
        let handle = gc_loop(&store, Arc::new(audit.clone())).spawn();

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        store.insert_upload(expired("u1", "QmB")).await;
        tokio::time::sleep(INTERVAL).await;
        // 3 回目の tick は期限切れなし
        tokio::time::sleep(INTERVAL).await;

        let status = handle.status();
        assert_eq!(status.state, LoopState::Running);
        assert_eq!(status.runs, 2);

        let total = handle.shutdown_and_join().await.unwrap();
        assert_eq!(total, 2);

        let records = audit.records().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].run, 0);
        assert_eq!(records[0].uploads[0].hash, "QmA");
        assert_eq!(records[1].run, 1);
        assert_eq!(records[1].uploads[0].hash, "QmB");
        assert_eq!(
            store.find_usage("u1").await.unwrap().current_data_used,
            1_000 - 10 - 20
        );
    }

    #[tokio::test(start_paused = true)]
    async fn skipped_items_do_not_count() {
        let store = store_with_usage().await;
        store.insert_upload(expired("u1", "QmA")).await;
        store.insert_upload(expired("u1", "QmUnknown")).await;
        let audit = MemoryAuditSink::new();
        let handle = gc_loop(&store, Arc::new(audit.clone())).spawn();

        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;
        let total = handle.shutdown_and_join().await.unwrap();

        assert_eq!(total, 1);
        assert_eq!(audit.records().await[0].uploads.len(), 1);
    }

    struct BrokenAudit;

    #[async_trait]
    impl AuditSink for BrokenAudit {
        async fn persist(&self, _record: &AuditRecord) -> Result<String, AuditError> {
            Err(AuditError::Backend("disk full".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn audit_failure_stops_the_loop() {
        let store = store_with_usage().await;
        store.insert_upload(expired("u1", "QmA")).await;
        let gc = gc_loop(&store, Arc::new(BrokenAudit));
        let status = gc.status();
        let handle = gc.spawn();

        let err = handle.join().await.unwrap_err();

        assert!(matches!(
            err,
            LoopError::AuditPersist { removed_total: 1, source: AuditError::Backend(_) }
        ));
        assert_eq!(status.borrow().state, LoopState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_ticks_keep_running() {
        let store = store_with_usage().await;
        let audit = MemoryAuditSink::new();
        let handle = gc_loop(&store, Arc::new(audit.clone())).spawn();

        tokio::time::sleep(INTERVAL * 5 + Duration::from_secs(1)).await;

        assert!(!handle.is_finished());
        let status = handle.status();
        assert_eq!(status.runs, 0);
        assert!(status.last_tick_at.is_some());
        assert_eq!(handle.shutdown_and_join().await.unwrap(), 0);
        assert!(audit.records().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_is_prompt_between_ticks() {
        let store = store_with_usage().await;
        let handle = gc_loop(&store, Arc::new(MemoryAuditSink::new())).spawn();
        tokio::time::sleep(INTERVAL + Duration::from_secs(1)).await;

        let started = tokio::time::Instant::now();
        handle.shutdown_and_join().await.unwrap();

        assert!(started.elapsed() < INTERVAL);
    }

    /// release されるまで `stat` の中で止まる oracle
    struct GatedOracle {
        entered: Arc<Notify>,
        release: Arc<Notify>,
    }

    #[async_trait]
    impl ContentSizeOracle for GatedOracle {
        async fn stat(&self, _hash: &str) -> Result<u64, StatError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(10)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_a_tick_lets_the_tick_finish() {
        let store = store_with_usage().await;
        store.insert_upload(expired("u1", "QmA")).await;
        let audit = MemoryAuditSink::new();
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let oracle = GatedOracle {
            entered: entered.clone(),
            release: release.clone(),
        };
        let mut handle =
            gc_loop_with_oracle(&store, Arc::new(oracle), Arc::new(audit.clone())).spawn();

        entered.notified().await;
        handle.request_shutdown();
        release.notify_one();
        let total = handle.wait().await.unwrap();

        assert_eq!(total, 1);
        let records = audit.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uploads[0].hash, "QmA");
        assert!(store.uploads().await.is_empty());
        assert_eq!(store.find_usage("u1").await.unwrap().current_data_used, 990);
    }

    #[tokio::test]
    async fn zero_interval_is_rejected() {
        let store = store_with_usage().await;
        let collector = collector(
            &store,
            Arc::new(StaticContentOracle::new()),
            Arc::new(MemoryAuditSink::new()),
        );
        assert!(matches!(
            GcLoop::new(collector, Duration::ZERO),
            Err(LoopError::InvalidInterval)
        ));
    }

    #[tokio::test]
    async fn dropping_the_sender_stops_the_loop() {
        let store = store_with_usage().await;
        let gc = gc_loop(&store, Arc::new(MemoryAuditSink::new()));
        let (tx, rx) = watch::channel(false);
        drop(tx);
        assert_eq!(gc.run(rx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn new_loop_is_idle() {
        let store = store_with_usage().await;
        let gc = gc_loop(&store, Arc::new(MemoryAuditSink::new()));
        assert_eq!(gc.state(), LoopState::Idle);
    }
}
