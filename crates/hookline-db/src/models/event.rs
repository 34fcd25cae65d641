//! Fired event model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// An immutable record of something that happened in the business
/// domain. Only the `processed` flag changes after insertion.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    /// External-safe identifier, e.g. `evt_9f2c4e...`.
    pub event_id: String,
    pub event_type_id: Uuid,
    /// Denormalized event type name, fixed at trigger time.
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    /// User that triggered the event, when known.
    pub triggered_by: Option<Uuid>,
    /// Customer the event concerns, when known.
    pub customer_id: Option<Uuid>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to persist a fired event.
#[derive(Debug, Clone)]
pub struct CreateEvent {
    pub event_id: String,
    pub event_type_id: Uuid,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
    pub triggered_by: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    pub source_ip: Option<String>,
    pub user_agent: Option<String>,
}

/// Generate a new external-safe event identifier.
#[must_use]
pub fn new_event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ids_are_prefixed_and_unique() {
        let a = new_event_id();
        let b = new_event_id();
        assert!(a.starts_with("evt_"));
        assert_eq!(a.len(), 4 + 32);
        assert_ne!(a, b);
    }
}
