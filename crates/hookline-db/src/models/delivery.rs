//! Delivery state machine model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery lifecycle state.
///
/// `Pending → Delivered | Retrying`, `Retrying → Delivered | Retrying |
/// Failed`. `Delivered` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Retrying,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    /// True for states that accept no further attempts.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Retrying => write!(f, "retrying"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(DeliveryStatus::Pending),
            "retrying" => Ok(DeliveryStatus::Retrying),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "failed" => Ok(DeliveryStatus::Failed),
            _ => Err(format!("Unknown delivery status: {s}")),
        }
    }
}

/// The unit of work "this event must reach that endpoint".
///
/// `max_attempts` is a snapshot of the endpoint's policy at creation
/// time. `claimed_at` is a worker lease: a claimed row is skipped by
/// other workers until the lease expires.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Delivery {
    pub id: Uuid,
    pub event_id: Uuid,
    pub endpoint_id: Uuid,
    pub status: DeliveryStatus,
    pub attempt_count: i32,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub last_response_code: Option<i16>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create a delivery row.
#[derive(Debug, Clone)]
pub struct CreateDelivery {
    pub event_id: Uuid,
    pub endpoint_id: Uuid,
    pub max_attempts: i32,
    pub scheduled_at: DateTime<Utc>,
}

/// One concrete HTTP try belonging to a delivery. Append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct DeliveryAttempt {
    pub id: Uuid,
    pub delivery_id: Uuid,
    pub attempt_number: i32,
    pub request_url: String,
    pub request_headers: serde_json::Value,
    /// Hex SHA-256 of the request body; the body itself is not stored.
    pub request_body_sha256: String,
    pub response_code: Option<i16>,
    pub response_headers: Option<serde_json::Value>,
    /// Response body truncated to a bounded size.
    pub response_body: Option<String>,
    pub latency_ms: i32,
    pub is_successful: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Data needed to record an attempt.
#[derive(Debug, Clone)]
pub struct CreateDeliveryAttempt {
    pub delivery_id: Uuid,
    pub attempt_number: i32,
    pub request_url: String,
    pub request_headers: serde_json::Value,
    pub request_body_sha256: String,
    pub response_code: Option<i16>,
    pub response_headers: Option<serde_json::Value>,
    pub response_body: Option<String>,
    pub latency_ms: i32,
    pub is_successful: bool,
    pub error_type: Option<String>,
    pub error_message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!DeliveryStatus::Pending.is_terminal());
        assert!(!DeliveryStatus::Retrying.is_terminal());
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Failed.is_terminal());
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in ["pending", "retrying", "delivered", "failed"] {
            let parsed: DeliveryStatus = s.parse().unwrap();
            assert_eq!(parsed.to_string(), s);
        }
        assert!("unknown".parse::<DeliveryStatus>().is_err());
    }
}
