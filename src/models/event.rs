use cert_render::{PlacementSpec, DEFAULT_FONT_KEY};
use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name placement stored with an event.
///
/// `x_percent`/`y_percent` stay unset until a template has been uploaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub x_percent: Option<f32>,
    pub y_percent: Option<f32>,
    pub font_size: u32,
    pub font_color: String,
    pub font_key: String,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x_percent: None,
            y_percent: None,
            font_size: 36,
            font_color: "#000000".to_string(),
            font_key: DEFAULT_FONT_KEY.to_string(),
        }
    }
}

impl Placement {
    pub fn is_configured(&self) -> bool {
        self.x_percent.is_some() && self.y_percent.is_some()
    }

    /// Renderer parameters, or `None` while no position is set.
    pub fn to_spec(&self) -> Option<PlacementSpec> {
        Some(PlacementSpec {
            x_percent: self.x_percent?,
            y_percent: self.y_percent?,
            font_size: self.font_size,
            font_color: self.font_color.clone(),
            font_key: self.font_key.clone(),
        })
    }

    /// Replace all values, clamping position and size and normalizing colour and font.
    pub fn apply(&mut self, spec: &PlacementSpec) {
        let spec = spec.sanitized();
        self.x_percent = Some(spec.x_percent);
        self.y_percent = Some(spec.y_percent);
        self.font_size = spec.font_size;
        self.font_color = spec.font_color;
        self.font_key = spec.font_key;
    }
}

/// Input for creating an event.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub is_visible: bool,
    pub created_at: DateTime<Utc>,
    pub template_filename: Option<String>,
    pub placement: Placement,
    pub is_protected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub is_archived: bool,
    pub show_in_archive: bool,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn new(id: EventId, new: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            description: new.description,
            event_date: new.event_date,
            is_visible: new.is_visible,
            created_at: now,
            template_filename: None,
            placement: Placement::default(),
            is_protected: false,
            access_token: None,
            is_archived: false,
            show_in_archive: false,
            archived_at: None,
        }
    }

    pub fn has_template(&self) -> bool {
        self.template_filename.is_some()
    }

    /// Shown on the public event list.
    pub fn is_publicly_listed(&self) -> bool {
        self.is_visible && !self.is_archived && !self.is_protected
    }

    /// Shown on the public archive page.
    pub fn is_in_public_archive(&self) -> bool {
        self.is_visible && self.is_archived && self.show_in_archive && !self.is_protected
    }

    /// Attach a new template file, returning the one it replaces.
    ///
    /// The first template centres the name.
    pub fn set_template(&mut self, filename: String) -> Option<String> {
        if !self.placement.is_configured() {
            self.placement.x_percent = Some(50.0);
            self.placement.y_percent = Some(50.0);
        }
        self.template_filename.replace(filename)
    }

    /// Detach the template and forget the position.
    pub fn clear_template(&mut self) -> Option<String> {
        self.placement.x_percent = None;
        self.placement.y_percent = None;
        self.template_filename.take()
    }

    pub fn set_archived(&mut self, archived: bool, show_in_archive: bool, now: DateTime<Utc>) {
        if archived {
            if !self.is_archived {
                self.archived_at = Some(now);
            }
            self.is_archived = true;
            self.show_in_archive = show_in_archive;
        } else {
            self.is_archived = false;
            self.show_in_archive = false;
            self.archived_at = None;
        }
    }

    /// Turn on protection with a fresh access token and return it.
    pub fn enable_protection(&mut self) -> String {
        let token = generate_access_token();
        self.is_protected = true;
        self.access_token = Some(token.clone());
        token
    }

    pub fn disable_protection(&mut self) {
        self.is_protected = false;
        self.access_token = None;
    }

    /// Whether `token` grants access. Unprotected events need no token.
    pub fn allows_access(&self, token: Option<&str>) -> bool {
        if !self.is_protected {
            return true;
        }
        match (self.access_token.as_deref(), token) {
            (Some(expected), Some(given)) => constant_time_eq(expected.as_bytes(), given.as_bytes()),
            _ => false,
        }
    }
}

/// 32 random bytes, hex encoded.
pub fn generate_access_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    hex::encode(bytes)
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
