//! Collector - 1 回分の回収（scan → reconcile → audit）
//!
//! 単発回収・dry run から直接使い、`GcLoop` からは tick ごとに使う

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::app::reconciler::Reconciler;
use crate::app::scanner::{ExpirationScanner, ScanError};
use crate::domain::{ReconcileReport, Upload};
use crate::ports::{AuditError, AuditRecord, AuditSink, Clock};

/// audit の書き込み失敗。`report` にはすでに処理した結果が残る
#[derive(Debug, Error)]
#[error("audit persistence failed: {source}")]
pub struct CollectError {
    pub report: ReconcileReport,
    #[source]
    pub source: AuditError,
}

/// 1 回分の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// 期限切れなし。audit は書かない
    NothingExpired,

    /// scan 失敗（許容）。audit は書かない
    ScanFailed(ScanError),

    /// 期限切れ upload を処理して audit 済み
    Collected {
        run: u64,
        expired: usize,
        report: ReconcileReport,
        audit_location: String,
    },
}

impl CollectOutcome {
    pub fn removed_count(&self) -> usize {
        match self {
            CollectOutcome::Collected { report, .. } => report.removed_count(),
            _ => 0,
        }
    }
}

pub struct Collector {
    scanner: ExpirationScanner,
    reconciler: Reconciler,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    next_run: u64,
}

impl Collector {
    pub fn new(
        scanner: ExpirationScanner,
        reconciler: Reconciler,
        audit: Arc<dyn AuditSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scanner,
            reconciler,
            audit,
            clock,
            next_run: 0,
        }
    }

    /// 次に audit される回の通し番号
    pub fn next_run(&self) -> u64 {
        self.next_run
    }

    /// scan → reconcile → 削除できた upload だけを audit に記録
    ///
    /// エラーになるのは audit の失敗だけ
    pub async fn collect_once(&mut self) -> Result<CollectOutcome, CollectError> {
        let expired = match self.scanner.scan().await {
            Ok(expired) => expired,
            Err(e) => return Ok(self.scan_outcome(e)),
        };
        let expired_count = expired.len();
        let report = self.reconciler.reconcile(expired).await;
        let audit_location = match self.persist(report.removed_uploads()).await {
            Ok(location) => location,
            Err(source) => return Err(CollectError { report, source }),
        };

        tracing::info!(
            run = self.next_run - 1,
            expired = expired_count,
            removed = report.removed_count(),
            skipped = report.skipped.len(),
            anomalies = report.anomalies(),
            bytes_debited = report.bytes_debited(),
            audit = %audit_location,
            "garbage collection pass complete"
        );
        Ok(CollectOutcome::Collected {
            run: self.next_run - 1,
            expired: expired_count,
            report,
            audit_location,
        })
    }

    /// 削除対象を scan して audit に書くだけ。stat / 減算 / 削除はしない
    pub async fn collect_dry(&mut self) -> Result<CollectOutcome, CollectError> {
        let expired = match self.scanner.scan().await {
            Ok(expired) => expired,
            Err(e) => return Ok(self.scan_outcome(e)),
        };
        let expired_count = expired.len();
        let audit_location = self
            .persist(expired)
            .await
            .map_err(|source| CollectError {
                report: ReconcileReport::default(),
                source,
            })?;
        tracing::info!(
            run = self.next_run - 1,
            expired = expired_count,
            audit = %audit_location,
            "DRY RUN: garbage collection pass complete"
        );
        Ok(CollectOutcome::Collected {
            run: self.next_run - 1,
            expired: expired_count,
            report: ReconcileReport::default(),
            audit_location,
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn scan_outcome(&self, err: ScanError) -> CollectOutcome {
        if err.is_benign() {
            tracing::debug!("no expired pins");
            CollectOutcome::NothingExpired
        } else {
            tracing::warn!(error = %err, "failed to get expired pins");
            CollectOutcome::ScanFailed(err)
        }
    }

    async fn persist(&mut self, uploads: Vec<Upload>) -> Result<String, AuditError> {
        let record = AuditRecord {
            run: self.next_run,
            timestamp: self.clock.now(),
            uploads,
        };
        let location = self.audit.persist(&record).await.inspect_err(|e| {
            tracing::error!(run = record.run, error = %e, "failed to persist audit record");
        })?;
        self.next_run += 1;
        Ok(location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Tier, Upload, UploadId, Usage};
    use crate::impls::{InMemoryPinStore, MemoryAuditSink, StaticContentOracle};
    use crate::ports::FixedClock;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use ulid::Ulid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn collector(store: &InMemoryPinStore, oracle: StaticContentOracle, audit: &MemoryAuditSink) -> Collector {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(now()));
        Collector::new(
            ExpirationScanner::new(Arc::new(store.clone()), clock.clone()),
            Reconciler::new(Arc::new(oracle), Arc::new(store.clone())),
            Arc::new(audit.clone()),
            clock,
        )
    }

    async fn seeded() -> (InMemoryPinStore, Upload, Upload) {
        let store = InMemoryPinStore::new();
        let ok = Upload::new(UploadId::from_ulid(Ulid::new()), "QmA", "u1", now() - Duration::hours(1));
        let unsized_pin = Upload::new(UploadId::from_ulid(Ulid::new()), "QmMissing", "u1", now() - Duration::hours(1));
        store.insert_upload(ok.clone()).await;
        store.insert_upload(unsized_pin.clone()).await;
        store.insert_usage(Usage::new("u1", 1_000, Tier::Paid)).await;
        (store, ok, unsized_pin)
    }

    #[tokio::test]
    async fn audit_contains_only_removed_uploads() {
        let (store, ok, _unsized) = seeded().await;
        let audit = MemoryAuditSink::new();
        let mut collector = collector(&store, StaticContentOracle::new().with_content("QmA", 10), &audit);

        let outcome = collector.collect_once().await.unwrap();

        assert_eq!(outcome.removed_count(), 1);
        assert!(matches!(outcome, CollectOutcome::Collected { run: 0, expired: 2, .. }));
        let records = audit.records().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].uploads, vec![ok]);
        assert_eq!(records[0].timestamp, now());
        assert_eq!(collector.next_run(), 1);
    }

    #[tokio::test]
    async fn nothing_expired_writes_no_audit() {
        let store = InMemoryPinStore::new();
        let audit = MemoryAuditSink::new();
        let mut collector = collector(&store, StaticContentOracle::new(), &audit);

        let outcome = collector.collect_once().await.unwrap();

        assert_eq!(outcome, CollectOutcome::NothingExpired);
        assert!(audit.records().await.is_empty());
        assert_eq!(collector.next_run(), 0);
    }

    #[tokio::test]
    async fn dry_run_changes_nothing() {
        let (store, ok, unsized_pin) = seeded().await;
        let audit = MemoryAuditSink::new();
        let mut collector = collector(&store, StaticContentOracle::new().with_content("QmA", 10), &audit);

        let outcome = collector.collect_dry().await.unwrap();

        assert_eq!(outcome.removed_count(), 0);
        assert!(store.get_upload(ok.id).await.is_some());
        assert!(store.get_upload(unsized_pin.id).await.is_some());
        assert_eq!(store.uploads().await.len(), 2);
        let records = audit.records().await;
        assert_eq!(records[0].uploads.len(), 2);
    }
}
