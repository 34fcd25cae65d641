//! Persistence contract required by the dispatch logic.
//!
//! The dispatcher, delivery engine and admin API are written against
//! the [`WebhookStore`] trait; `PgStore` backs production deployments
//! and `MemoryStore` backs tests and embedded runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    CreateDelivery, CreateDeliveryAttempt, CreateEndpoint, CreateEvent, CreateEventType,
    CreateFilter, Delivery, DeliveryAttempt, DeliveryStatus, Endpoint, EndpointFilter,
    EndpointSubscription, Event, EventType, UpdateEndpoint,
};

/// Filters for listing event types.
#[derive(Debug, Clone, Default)]
pub struct EventTypeQuery {
    pub category: Option<String>,
    pub active: Option<bool>,
}

/// Filters and paging for listing endpoints.
#[derive(Debug, Clone)]
pub struct EndpointQuery {
    pub active: Option<bool>,
    pub name_contains: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for EndpointQuery {
    fn default() -> Self {
        Self {
            active: None,
            name_contains: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Filters and paging for searching fired events.
#[derive(Debug, Clone)]
pub struct EventQuery {
    pub event_type_id: Option<Uuid>,
    pub processed: Option<bool>,
    pub occurred_from: Option<DateTime<Utc>>,
    pub occurred_to: Option<DateTime<Utc>>,
    pub triggered_by: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            event_type_id: None,
            processed: None,
            occurred_from: None,
            occurred_to: None,
            triggered_by: None,
            customer_id: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Filters and paging for searching deliveries.
#[derive(Debug, Clone)]
pub struct DeliveryQuery {
    pub endpoint_id: Option<Uuid>,
    pub event_id: Option<Uuid>,
    pub status: Option<DeliveryStatus>,
    pub min_attempts: Option<i32>,
    pub max_attempts: Option<i32>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for DeliveryQuery {
    fn default() -> Self {
        Self {
            endpoint_id: None,
            event_id: None,
            status: None,
            min_attempts: None,
            max_attempts: None,
            created_from: None,
            created_to: None,
            limit: 50,
            offset: 0,
        }
    }
}

/// Storage operations the dispatch subsystem depends on.
///
/// Implementations must make `insert_delivery` dedupe on
/// `(event_id, endpoint_id)` and `claim_due_deliveries` atomic with
/// respect to concurrent workers (see the lease semantics on
/// [`Delivery::claimed_at`](crate::models::Delivery)).
#[async_trait]
pub trait WebhookStore: Send + Sync {
    // --- Event types -----------------------------------------------------

    /// Insert a new event type; `StoreError::Duplicate` if the name exists.
    async fn insert_event_type(&self, input: CreateEventType) -> Result<EventType, StoreError>;

    async fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>, StoreError>;

    async fn find_event_type_by_name(&self, name: &str) -> Result<Option<EventType>, StoreError>;

    async fn list_event_types(&self, query: EventTypeQuery) -> Result<Vec<EventType>, StoreError>;

    async fn set_event_type_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError>;

    // --- Endpoints -------------------------------------------------------

    /// Insert an endpoint plus one subscription row per event type id.
    async fn insert_endpoint(
        &self,
        input: CreateEndpoint,
        event_type_ids: Vec<Uuid>,
    ) -> Result<Endpoint, StoreError>;

    async fn find_endpoint(&self, id: Uuid) -> Result<Option<Endpoint>, StoreError>;

    async fn list_endpoints(&self, query: EndpointQuery) -> Result<Vec<Endpoint>, StoreError>;

    /// Count endpoints matching the query filters, ignoring paging.
    async fn count_endpoints(&self, query: EndpointQuery) -> Result<i64, StoreError>;

    /// Partial update; returns the updated row, or `None` if absent.
    /// Existing deliveries keep their policy snapshot.
    async fn update_endpoint(
        &self,
        id: Uuid,
        update: UpdateEndpoint,
    ) -> Result<Option<Endpoint>, StoreError>;

    /// Delete an endpoint and its subscriptions and filters.
    async fn delete_endpoint(&self, id: Uuid) -> Result<bool, StoreError>;

    async fn list_subscriptions(
        &self,
        endpoint_id: Uuid,
    ) -> Result<Vec<EndpointSubscription>, StoreError>;

    async fn set_subscription_active(
        &self,
        endpoint_id: Uuid,
        event_type_id: Uuid,
        active: bool,
    ) -> Result<bool, StoreError>;

    /// Endpoints that should currently receive this event type: the
    /// endpoint is active and its subscription row is active.
    async fn endpoints_for_event_type(
        &self,
        event_type_id: Uuid,
    ) -> Result<Vec<Endpoint>, StoreError>;

    // --- Filters ---------------------------------------------------------

    async fn insert_filter(&self, input: CreateFilter) -> Result<EndpointFilter, StoreError>;

    async fn list_filters(&self, endpoint_id: Uuid) -> Result<Vec<EndpointFilter>, StoreError>;

    async fn delete_filter(&self, id: Uuid) -> Result<bool, StoreError>;

    // --- Events ----------------------------------------------------------

    async fn insert_event(&self, input: CreateEvent) -> Result<Event, StoreError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn search_events(&self, query: EventQuery) -> Result<Vec<Event>, StoreError>;

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), StoreError>;

    // --- Deliveries ------------------------------------------------------

    /// Create a delivery in `Pending`; returns `None` when a delivery
    /// for the same (event, endpoint) pair already exists.
    async fn insert_delivery(&self, input: CreateDelivery)
        -> Result<Option<Delivery>, StoreError>;

    async fn find_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn search_deliveries(&self, query: DeliveryQuery) -> Result<Vec<Delivery>, StoreError>;

    /// Atomically claim up to `batch` due deliveries for execution.
    ///
    /// A due delivery is pending or retrying, within its attempt budget,
    /// with `scheduled_at <= now` or `next_retry_at <= now`, and not
    /// held by a live lease (`claimed_at` null or older than `lease`).
    /// Claimed rows get `claimed_at = now` so concurrent workers never
    /// double-deliver; the lease expires if a worker dies mid-attempt.
    async fn claim_due_deliveries(
        &self,
        batch: i64,
        lease: chrono::Duration,
    ) -> Result<Vec<Delivery>, StoreError>;

    /// Terminal success: stamps `delivered_at`, clears the retry slot
    /// and lease.
    async fn mark_delivery_delivered(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: i16,
    ) -> Result<(), StoreError>;

    /// Non-terminal failure: schedules the next attempt.
    async fn mark_delivery_retrying(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError>;

    /// Terminal failure: attempts exhausted (or endpoint gone).
    async fn mark_delivery_failed(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError>;

    // --- Attempts --------------------------------------------------------

    async fn insert_attempt(
        &self,
        input: CreateDeliveryAttempt,
    ) -> Result<DeliveryAttempt, StoreError>;

    async fn list_attempts(&self, delivery_id: Uuid)
        -> Result<Vec<DeliveryAttempt>, StoreError>;

    // --- Endpoint counters -----------------------------------------------

    /// Bump lifetime counters after an attempt: total always, success
    /// or failure depending on the outcome, plus the matching `last_*`
    /// timestamps.
    async fn record_endpoint_delivery(
        &self,
        endpoint_id: Uuid,
        success: bool,
    ) -> Result<(), StoreError>;
}
