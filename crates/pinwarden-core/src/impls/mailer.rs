//! Mailer implementations.
//!
//! - **LogMailer**: emits the message as a tracing event (no transport)
//! - **RecordingMailer**: keeps sent messages and can reject chosen recipients

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::{MailError, Mailer, OutgoingEmail};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(
            recipient = %email.recipient_address,
            recipient_name = %email.recipient_name,
            subject = %email.subject,
            content_type = %email.content_type,
            body_len = email.body.len(),
            "email handed to log mailer"
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<OutgoingEmail>>>,
    reject: HashSet<String>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every send addressed to `address`.
    pub fn rejecting(mut self, address: impl Into<String>) -> Self {
        self.reject.insert(address.into());
        self
    }

    pub async fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.reject.contains(&email.recipient_address) {
            return Err(MailError(format!(
                "recipient rejected: {}",
                email.recipient_address
            )));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
