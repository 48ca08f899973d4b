//! 选课通知发件箱
//!
//! 代替真正的任务队列与邮件发送：通知只进入内存发件箱。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// A queued email notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub queued_at: DateTime<Utc>,
}

/// Outbox of notifications waiting for delivery.
pub struct EnrollmentNotifier {
    sender: String,
    outbox: Mutex<Vec<Notification>>,
}

impl EnrollmentNotifier {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            outbox: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self, to: &str, subject: impl Into<String>, body: impl Into<String>) {
        let notification = Notification {
            from: self.sender.clone(),
            to: to.to_string(),
            subject: subject.into(),
            body: body.into(),
            queued_at: Utc::now(),
        };
        tracing::debug!(to = %notification.to, subject = %notification.subject, "notification queued");
        self.outbox.lock().push(notification);
    }

    pub fn pending(&self) -> usize {
        self.outbox.lock().len()
    }

    /// Copy of the outbox, oldest first.
    pub fn outbox(&self) -> Vec<Notification> {
        self.outbox.lock().clone()
    }

    /// Empties the outbox, handing the notifications to the caller.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.outbox.lock())
    }
}
