//! Data model for the webhook dispatch subsystem.

mod delivery;
mod endpoint;
mod event;
mod event_type;
mod filter;

pub use delivery::{
    CreateDelivery, CreateDeliveryAttempt, Delivery, DeliveryAttempt, DeliveryStatus,
};
pub use endpoint::{
    CreateEndpoint, Endpoint, EndpointSubscription, RetryStrategy, SignatureAlgorithm,
    UpdateEndpoint,
};
pub use event::{new_event_id, CreateEvent, Event};
pub use event_type::{CreateEventType, EventType};
pub use filter::{CreateFilter, EndpointFilter, FilterOperator};
