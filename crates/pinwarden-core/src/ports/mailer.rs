//! Mailer port - メール 1 通の送信
//!
//! 送信の仕組みはこの trait の向こう側

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mail send failed: {0}")]
pub struct MailError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub content_type: String,
    pub recipient_name: String,
    pub recipient_address: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}
