//! ReminderDispatcher - ダイジェストを mailer に渡す
//!
//! 1 メッセージにつき 1 回送信。失敗した宛先はログと report に残し、残りは送り続ける。
//! リトライはしない。

use std::sync::Arc;

use crate::domain::{DIGEST_CONTENT_TYPE, DispatchReport, ReminderMessage};
use crate::ports::{Mailer, OutgoingEmail};

pub struct ReminderDispatcher {
    mailer: Arc<dyn Mailer>,
    subject: String,
}

impl ReminderDispatcher {
    pub fn new(mailer: Arc<dyn Mailer>, subject: impl Into<String>) -> Self {
        Self {
            mailer,
            subject: subject.into(),
        }
    }

    pub async fn dispatch(&self, reminders: &[ReminderMessage]) -> DispatchReport {
        let mut report = DispatchReport::default();
        for reminder in reminders {
            let email = OutgoingEmail {
                subject: self.subject.clone(),
                body: reminder.message.clone(),
                content_type: DIGEST_CONTENT_TYPE.to_string(),
                recipient_name: reminder.username.clone(),
                recipient_address: reminder.email_address.clone(),
            };
            match self.mailer.send_email(&email).await {
                Ok(()) => report.sent.push(reminder.username.clone()),
                Err(e) => {
                    tracing::warn!(
                        user = %reminder.username,
                        recipient = %reminder.email_address,
                        error = %e,
                        "failed to send reminder"
                    );
                    report.failed.push((reminder.username.clone(), e.to_string()));
                }
            }
        }
        report
    }
}
