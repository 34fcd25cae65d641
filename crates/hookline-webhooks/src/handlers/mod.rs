//! HTTP handlers for the webhook admin API.

pub mod deliveries;
pub mod endpoints;
pub mod event_types;
pub mod events;
