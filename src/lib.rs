//! certportal - certificate download portal
//!
//! Participants prove they registered for an event and download a PNG
//! certificate with their name drawn onto the event's template.
//! This library exposes modules for integration testing.

pub mod api;
pub mod assets;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
