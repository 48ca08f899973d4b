//! 请求级审计记录
//!
//! 每个请求作用域一个实例，作用域结束时写入数据库。

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::entities::AuditEntry;
use crate::infrastructure::container::Dispose;
use crate::infrastructure::database::MemoryDatabase;

pub struct AuditTrail {
    request_id: Uuid,
    db: Arc<MemoryDatabase>,
    pending: Mutex<Vec<AuditEntry>>,
}

impl AuditTrail {
    pub fn new(request_id: Uuid, db: Arc<MemoryDatabase>) -> Self {
        Self {
            request_id,
            db,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn record(&self, action: &str, subject: impl Into<String>) {
        self.pending.lock().push(AuditEntry {
            request_id: self.request_id,
            action: action.to_string(),
            subject: subject.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Entries recorded but not yet flushed.
    pub fn pending(&self) -> Vec<AuditEntry> {
        self.pending.lock().clone()
    }

    /// Writes pending entries to the database; returns how many were written.
    pub fn flush(&self) -> usize {
        let entries = std::mem::take(&mut *self.pending.lock());
        if entries.is_empty() {
            return 0;
        }

        let count = entries.len();
        match self.db.append_audit(entries) {
            Ok(written) => written,
            Err(e) => {
                tracing::warn!(request_id = %self.request_id, lost = count, "audit flush failed: {}", e);
                0
            }
        }
    }
}

#[async_trait]
impl Dispose for AuditTrail {
    async fn dispose(&self) {
        let written = self.flush();
        if written > 0 {
            tracing::debug!(request_id = %self.request_id, written, "audit trail flushed");
        }
    }
}
