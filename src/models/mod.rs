pub mod activity;
pub mod config;
pub mod email;
pub mod event;
pub mod participant;

pub use activity::{AdminLogEntry, DownloadLog};
pub use config::{
    AdminConfig, AppConfig, CaptchaConfig, EventSeed, LinksConfig, ParticipantSeed,
    PlacementSeed, ProxyConfig, StorageConfig,
};
pub use email::{Email, EmailError};
pub use event::{Event, EventId, NewEvent, Placement};
pub use participant::{Participant, ParticipantId};
