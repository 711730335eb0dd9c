use super::{Email, EventId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u64);

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Someone registered for an event. Emails are unique per event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub event_id: EventId,
    pub name: String,
    pub email: Email,
    /// Pre-rendered certificate served instead of the event template.
    pub certificate_filename: Option<String>,
    pub download_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    pub fn has_custom_certificate(&self) -> bool {
        self.certificate_filename.is_some()
    }
}
