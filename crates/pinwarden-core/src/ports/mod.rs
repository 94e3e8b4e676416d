//! Ports - 外部コラボレータのインターフェース
//!
//! 各 trait が外部システム（DB テーブル、コンテンツストア、メール送信、audit 保存）との
//! 境界になる。app 層はこれらの trait だけを通して話す。

pub mod audit_sink;
pub mod clock;
pub mod content_oracle;
pub mod directory;
pub mod expiry_commit;
pub mod id_generator;
pub mod mailer;
pub mod upload_store;
pub mod usage_ledger;

pub use self::audit_sink::{AuditError, AuditRecord, AuditSink};
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::content_oracle::{ContentSizeOracle, StatError};
pub use self::directory::{DirectoryError, UserDirectory};
pub use self::expiry_commit::{CommitError, ExpiryCommit, SequentialCommit};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::mailer::{MailError, Mailer, OutgoingEmail};
pub use self::upload_store::{StoreError, UploadFilter, UploadStore};
pub use self::usage_ledger::{LedgerError, UsageLedger};
