//! Data model and persistence contract for the hookline webhook
//! dispatcher.
//!
//! The dispatch logic depends only on the [`store::WebhookStore`]
//! trait; this crate ships a Postgres implementation ([`store::PgStore`],
//! sqlx with embedded migrations) and an in-memory one
//! ([`store::MemoryStore`]) for tests and embedded use.

pub mod error;
pub mod migrations;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use migrations::run_migrations;
pub use store::{
    DeliveryQuery, EndpointQuery, EventQuery, EventTypeQuery, MemoryStore, PgStore, WebhookStore,
};
