//! Business logic services for the webhook dispatch subsystem.

pub mod delivery;
pub mod endpoints;
pub mod event_types;
pub mod events;
