//! Impls - port implementations for development, tests and the CLI.
//!
//! # Included
//! - **InMemoryPinStore**: uploads + usage ledger + directory, atomic expiry commit
//! - **StaticContentOracle**: fixed hash -> size table
//! - **FileAuditSink** / **MemoryAuditSink**
//! - **LogMailer** / **RecordingMailer**
//! - **StateSnapshot**: JSON image of the above

pub mod content_oracle;
pub mod fs_audit;
pub mod inmem_store;
pub mod mailer;
pub mod snapshot;

pub use self::content_oracle::StaticContentOracle;
pub use self::fs_audit::{AUDIT_FILE_MODE, FileAuditSink, MemoryAuditSink};
pub use self::inmem_store::InMemoryPinStore;
pub use self::mailer::{LogMailer, RecordingMailer};
pub use self::snapshot::{SnapshotError, StateSnapshot};
