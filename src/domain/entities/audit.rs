use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One mutation recorded during a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Scope (request) that performed the mutation
    pub request_id: Uuid,
    pub action: String,
    pub subject: String,
    pub recorded_at: DateTime<Utc>,
}
