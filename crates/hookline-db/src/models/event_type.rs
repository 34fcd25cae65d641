//! Event type catalog model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A registered event type that producers may fire and endpoints may
/// subscribe to.
///
/// `payload_schema` is a shallow declarative description; only the
/// `"required"` string list is enforced when an event is triggered.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct EventType {
    pub id: Uuid,
    /// Unique dotted name, e.g. `invoice.paid`.
    pub name: String,
    /// Grouping label, e.g. `billing`.
    pub category: String,
    pub payload_schema: serde_json::Value,
    pub sample_payload: Option<serde_json::Value>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventType {
    /// Field names listed under `"required"` in the payload schema.
    #[must_use]
    pub fn required_fields(&self) -> Vec<&str> {
        self.payload_schema
            .get("required")
            .and_then(|r| r.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Data needed to register a new event type.
#[derive(Debug, Clone)]
pub struct CreateEventType {
    pub name: String,
    pub category: String,
    pub payload_schema: serde_json::Value,
    pub sample_payload: Option<serde_json::Value>,
}
