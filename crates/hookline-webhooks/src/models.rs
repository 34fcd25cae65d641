//! Request and response models for the webhook admin API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use hookline_db::models::{
    Delivery, DeliveryAttempt, DeliveryStatus, Endpoint, EndpointFilter, Event, EventType,
    FilterOperator, RetryStrategy, SignatureAlgorithm,
};

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Request to register a new event type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterEventTypeRequest {
    /// Dotted event type name, e.g. `invoice.paid`.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Grouping category, e.g. `billing`.
    #[validate(length(min = 1, max = 100, message = "Category must be 1-100 characters"))]
    pub category: String,

    /// Payload schema; only the `required` field list is enforced.
    #[serde(default)]
    pub payload_schema: serde_json::Value,

    /// Example payload shown in documentation and used by the test runner.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_payload: Option<serde_json::Value>,
}

/// Query parameters for listing event types.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct ListEventTypesQuery {
    /// Filter by category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Filter by active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Response for a single event type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventTypeResponse {
    /// Event type ID.
    pub id: Uuid,

    /// Dotted name.
    pub name: String,

    /// Grouping category.
    pub category: String,

    /// Payload schema.
    pub payload_schema: serde_json::Value,

    /// Example payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_payload: Option<serde_json::Value>,

    /// Whether new events of this type are accepted.
    pub active: bool,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<EventType> for EventTypeResponse {
    fn from(t: EventType) -> Self {
        Self {
            id: t.id,
            name: t.name,
            category: t.category,
            payload_schema: t.payload_schema,
            sample_payload: t.sample_payload,
            active: t.active,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

/// Paginated event type list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventTypeListResponse {
    pub event_types: Vec<EventTypeResponse>,
    pub total: usize,
}

/// Request to activate or deactivate an event type.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SetEventTypeActiveRequest {
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Endpoints
// ---------------------------------------------------------------------------

/// Request to create a webhook endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateEndpointRequest {
    /// Endpoint display name.
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// Destination URL.
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: String,

    /// HTTP method for deliveries (POST, PUT, PATCH).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    /// Content type for the outbound request body.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Shared signing secret; stored encrypted, never returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8, max = 255, message = "Secret must be 8-255 characters"))]
    pub secret: Option<String>,

    /// HMAC digest algorithm.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<SignatureAlgorithm>,

    /// Retry backoff strategy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<RetryStrategy>,

    /// Base retry delay in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 86400, message = "Retry delay must be 1-86400 seconds"))]
    pub retry_delay_secs: Option<i32>,

    /// Maximum delivery attempts.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 20, message = "Max attempts must be 1-20"))]
    pub max_attempts: Option<i32>,

    /// Per-request timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 300, message = "Timeout must be 1-300 seconds"))]
    pub timeout_secs: Option<i32>,

    /// Whether TLS certificates are verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,

    /// Whether payload filters are applied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_filtering: Option<bool>,

    /// Extra headers added to every outbound request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<serde_json::Value>,

    /// Event types this endpoint subscribes to.
    #[serde(default)]
    pub event_type_ids: Vec<Uuid>,

    /// Actor who created the endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Uuid>,
}

/// Request to update a webhook endpoint. Omitted fields are unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateEndpointRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// New signing secret; replaces the stored one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 8, max = 255, message = "Secret must be 8-255 characters"))]
    pub secret: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_algorithm: Option<SignatureAlgorithm>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_strategy: Option<RetryStrategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 86400, message = "Retry delay must be 1-86400 seconds"))]
    pub retry_delay_secs: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 20, message = "Max attempts must be 1-20"))]
    pub max_attempts: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 300, message = "Timeout must be 1-300 seconds"))]
    pub timeout_secs: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_filtering: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_headers: Option<serde_json::Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
}

/// Query parameters for listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, IntoParams)]
pub struct ListEndpointsQuery {
    /// Filter by active flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    /// Filter by name (partial match).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_contains: Option<String>,

    /// Maximum number of results.
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: i64,
}

impl Default for ListEndpointsQuery {
    fn default() -> Self {
        Self {
            active: None,
            name_contains: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    50
}

/// Response for a single endpoint. The signing secret is never included.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    pub http_method: String,
    pub content_type: String,
    /// Whether a signing secret is configured.
    pub has_secret: bool,
    pub signature_algorithm: SignatureAlgorithm,
    pub retry_strategy: RetryStrategy,
    pub retry_delay_secs: i32,
    pub max_attempts: i32,
    pub timeout_secs: i32,
    pub verify_tls: bool,
    pub enable_filtering: bool,
    pub custom_headers: serde_json::Value,
    pub total_deliveries: i64,
    pub successful_deliveries: i64,
    pub failed_deliveries: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_delivery_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_failure_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Endpoint> for EndpointResponse {
    fn from(e: Endpoint) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            url: e.url,
            http_method: e.http_method,
            content_type: e.content_type,
            has_secret: e.secret_encrypted.is_some(),
            signature_algorithm: e.signature_algorithm,
            retry_strategy: e.retry_strategy,
            retry_delay_secs: e.retry_delay_secs,
            max_attempts: e.max_attempts,
            timeout_secs: e.timeout_secs,
            verify_tls: e.verify_tls,
            enable_filtering: e.enable_filtering,
            custom_headers: e.custom_headers,
            total_deliveries: e.total_deliveries,
            successful_deliveries: e.successful_deliveries,
            failed_deliveries: e.failed_deliveries,
            last_delivery_at: e.last_delivery_at,
            last_success_at: e.last_success_at,
            last_failure_at: e.last_failure_at,
            active: e.active,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

/// Paginated endpoint list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EndpointListResponse {
    pub endpoints: Vec<EndpointResponse>,
    pub total: usize,
    pub limit: i64,
    pub offset: i64,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Request to add a payload filter to an endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateFilterRequest {
    /// Dot-separated path into the event payload, e.g. `data.amount`.
    #[validate(length(min = 1, max = 500, message = "Field path must be 1-500 characters"))]
    pub field_path: String,

    /// Comparison operator.
    pub operator: FilterOperator,

    /// Comparison value; ignored by `exists` / `not_exists`.
    #[serde(default)]
    pub value: serde_json::Value,

    /// `true` keeps matching payloads, `false` keeps non-matching ones.
    #[serde(default = "default_true")]
    pub include_on_match: bool,
}

fn default_true() -> bool {
    true
}

/// Response for a single filter.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FilterResponse {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub field_path: String,
    pub operator: FilterOperator,
    pub value: serde_json::Value,
    pub include_on_match: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<EndpointFilter> for FilterResponse {
    fn from(f: EndpointFilter) -> Self {
        Self {
            id: f.id,
            endpoint_id: f.endpoint_id,
            field_path: f.field_path,
            operator: f.operator,
            value: f.value,
            include_on_match: f.include_on_match,
            active: f.active,
            created_at: f.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Request to trigger an event.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct TriggerEventRequest {
    /// Registered event type name.
    #[validate(length(min = 1, max = 255, message = "Event type must be 1-255 characters"))]
    pub event_type: String,

    /// Event payload; validated against the event type's required fields.
    pub payload: serde_json::Value,

    /// Actor that caused the event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<Uuid>,

    /// Customer the event relates to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,

    /// Originating IP, recorded for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip: Option<String>,

    /// Originating user agent, recorded for audit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

/// Query parameters for searching events.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct SearchEventsQuery {
    /// Filter by event type name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    /// Filter by processed flag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,

    /// Filter by triggering actor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<Uuid>,

    /// Filter by related customer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,

    /// Only events at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_after: Option<DateTime<Utc>>,

    /// Only events at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub occurred_before: Option<DateTime<Utc>>,

    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<i64>,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Response for a single event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventResponse {
    pub id: Uuid,
    /// Public identifier, `evt_<hex>`.
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub triggered_by: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Event> for EventResponse {
    fn from(e: Event) -> Self {
        Self {
            id: e.id,
            event_id: e.event_id,
            event_type: e.event_type,
            payload: e.payload,
            occurred_at: e.occurred_at,
            processed: e.processed,
            processed_at: e.processed_at,
            triggered_by: e.triggered_by,
            customer_id: e.customer_id,
            created_at: e.created_at,
        }
    }
}

/// Result of triggering an event: the stored event plus the deliveries
/// fanned out to matching endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TriggerEventResponse {
    pub event: EventResponse,
    pub deliveries: Vec<DeliveryResponse>,
}

/// Paginated event list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
    pub total: usize,
}

// ---------------------------------------------------------------------------
// Deliveries
// ---------------------------------------------------------------------------

/// Query parameters for searching deliveries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
pub struct SearchDeliveriesQuery {
    /// Filter by endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_id: Option<Uuid>,

    /// Filter by event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<Uuid>,

    /// Filter by delivery status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeliveryStatus>,

    /// Minimum attempt count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_attempts: Option<i32>,

    /// Maximum attempt count.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<i32>,

    /// Only deliveries created at or after this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,

    /// Only deliveries created at or before this instant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,

    /// Maximum number of results.
    #[serde(default)]
    pub limit: Option<i64>,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Response for a single delivery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryResponse {
    pub id: Uuid,
    pub event_id: Uuid,
    pub endpoint_id: Uuid,
    pub status: DeliveryStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_response_code: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Delivery> for DeliveryResponse {
    fn from(d: Delivery) -> Self {
        Self {
            id: d.id,
            event_id: d.event_id,
            endpoint_id: d.endpoint_id,
            status: d.status,
            attempt_count: d.attempt_count,
            max_attempts: d.max_attempts,
            scheduled_at: d.scheduled_at,
            next_retry_at: d.next_retry_at,
            delivered_at: d.delivered_at,
            last_response_code: d.last_response_code,
            last_error: d.last_error,
            created_at: d.created_at,
            updated_at: d.updated_at,
        }
    }
}

/// Paginated delivery list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryListResponse {
    pub deliveries: Vec<DeliveryResponse>,
    pub total: usize,
}

/// Response for a single delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAttemptResponse {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub attempt_number: i32,
    pub request_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_code: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
    pub latency_ms: i32,
    pub is_successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DeliveryAttempt> for DeliveryAttemptResponse {
    fn from(a: DeliveryAttempt) -> Self {
        Self {
            id: a.id,
            delivery_id: a.delivery_id,
            attempt_number: a.attempt_number,
            request_url: a.request_url,
            response_code: a.response_code,
            response_body: a.response_body,
            latency_ms: a.latency_ms,
            is_successful: a.is_successful,
            error_type: a.error_type,
            error_message: a.error_message,
            created_at: a.created_at,
        }
    }
}

/// Attempt list for one delivery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAttemptListResponse {
    pub attempts: Vec<DeliveryAttemptResponse>,
}

// ---------------------------------------------------------------------------
// Test runner
// ---------------------------------------------------------------------------

/// Request to send a one-off test delivery to an endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct TestEndpointRequest {
    /// Payload to send; defaults to a fixed test payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,

    /// Alternate destination URL, validated like the configured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 2048, message = "URL must be 1-2048 characters"))]
    pub url_override: Option<String>,
}

/// Outcome of a test delivery. Nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TestEndpointResult {
    /// Whether the destination answered with a 2xx status.
    pub success: bool,

    /// HTTP status code, when a response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Round-trip latency in milliseconds.
    pub latency_ms: i32,

    /// Response body, truncated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,

    /// Transport or timeout error, when no response was received.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
