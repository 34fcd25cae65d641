//! Webhook event dispatch subsystem.
//!
//! Provides an event type registry, endpoint management with payload
//! filtering, async delivery with HMAC signing, configurable backoff
//! retries, and per-attempt delivery tracking.

pub mod crypto;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod validation;
pub mod worker;

pub use error::WebhookError;
pub use router::{webhooks_router, WebhooksState};
pub use services::delivery::DeliveryService;
pub use services::endpoints::EndpointService;
pub use services::event_types::EventTypeService;
pub use services::events::EventService;
pub use worker::{DeliveryWorker, WorkerConfig};
