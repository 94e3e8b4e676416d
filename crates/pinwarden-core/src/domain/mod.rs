//! ドメインモデル（ID、pin レコード、usage、reminder、バッチ結果）

pub mod ids;
pub mod reminder;
pub mod report;
pub mod state;
pub mod upload;
pub mod usage;
pub mod user;

pub use ids::{Id, IdMarker, ParseIdError, UploadId};
pub use reminder::{DIGEST_CONTENT_TYPE, ReminderMessage, render_digest};
pub use report::{DispatchReport, ReconcileReport, RemovedUpload, SkipReason, SkippedUpload};
pub use state::LoopState;
pub use upload::{DEFAULT_NETWORK, Upload};
pub use usage::{Tier, Usage};
pub use user::DirectoryEntry;
