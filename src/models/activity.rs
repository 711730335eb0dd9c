use super::{EventId, ParticipantId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One certificate download.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadLog {
    pub participant_id: ParticipantId,
    pub event_id: EventId,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
}

/// One mutating admin action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminLogEntry {
    pub admin: String,
    pub action: String,
    pub details: String,
    pub ip_address: String,
    pub timestamp: DateTime<Utc>,
}

impl AdminLogEntry {
    pub fn new(
        admin: impl Into<String>,
        action: impl Into<String>,
        details: impl Into<String>,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            admin: admin.into(),
            action: action.into(),
            details: details.into(),
            ip_address: ip_address.into(),
            timestamp: Utc::now(),
        }
    }
}
