//! Webhook endpoint (subscriber) model.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// HMAC digest algorithm used for the `X-Webhook-Signature` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    Sha1,
    Sha256,
    Sha512,
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::Sha1 => write!(f, "sha1"),
            SignatureAlgorithm::Sha256 => write!(f, "sha256"),
            SignatureAlgorithm::Sha512 => write!(f, "sha512"),
        }
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha1" => Ok(SignatureAlgorithm::Sha1),
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            "sha512" => Ok(SignatureAlgorithm::Sha512),
            _ => Err(format!("Unknown signature algorithm: {s}")),
        }
    }
}

/// Backoff strategy mapping attempt number to the delay before retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// Retry immediately (zero delay).
    Immediate,
    /// Constant delay of `retry_delay_secs`.
    Fixed,
    /// `retry_delay_secs * attempt_count`.
    Linear,
    /// `retry_delay_secs * 2^(attempt_count - 1)`.
    Exponential,
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryStrategy::Immediate => write!(f, "immediate"),
            RetryStrategy::Fixed => write!(f, "fixed"),
            RetryStrategy::Linear => write!(f, "linear"),
            RetryStrategy::Exponential => write!(f, "exponential"),
        }
    }
}

impl std::str::FromStr for RetryStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "immediate" => Ok(RetryStrategy::Immediate),
            "fixed" => Ok(RetryStrategy::Fixed),
            "linear" => Ok(RetryStrategy::Linear),
            "exponential" => Ok(RetryStrategy::Exponential),
            _ => Err(format!("Unknown retry strategy: {s}")),
        }
    }
}

/// A configured HTTP subscriber.
///
/// Retry policy fields are snapshotted onto each `Delivery` at creation
/// time; editing an endpoint never rewrites in-flight deliveries.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub http_method: String,
    pub content_type: String,
    /// AES-256-GCM encrypted shared secret (base64), if configured.
    pub secret_encrypted: Option<String>,
    pub signature_algorithm: SignatureAlgorithm,
    pub retry_strategy: RetryStrategy,
    pub retry_delay_secs: i32,
    pub max_attempts: i32,
    pub timeout_secs: i32,
    pub verify_tls: bool,
    pub enable_filtering: bool,
    /// Extra headers added to every outbound request, as a string map.
    pub custom_headers: serde_json::Value,
    pub total_deliveries: i64,
    pub successful_deliveries: i64,
    pub failed_deliveries: i64,
    pub last_delivery_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data needed to create an endpoint.
#[derive(Debug, Clone)]
pub struct CreateEndpoint {
    pub name: String,
    pub description: Option<String>,
    pub url: String,
    pub http_method: String,
    pub content_type: String,
    pub secret_encrypted: Option<String>,
    pub signature_algorithm: SignatureAlgorithm,
    pub retry_strategy: RetryStrategy,
    pub retry_delay_secs: i32,
    pub max_attempts: i32,
    pub timeout_secs: i32,
    pub verify_tls: bool,
    pub enable_filtering: bool,
    pub custom_headers: serde_json::Value,
    pub created_by: Option<Uuid>,
}

impl Default for CreateEndpoint {
    fn default() -> Self {
        Self {
            name: String::new(),
            description: None,
            url: String::new(),
            http_method: "POST".to_string(),
            content_type: "application/json".to_string(),
            secret_encrypted: None,
            signature_algorithm: SignatureAlgorithm::Sha256,
            retry_strategy: RetryStrategy::Exponential,
            retry_delay_secs: 60,
            max_attempts: 5,
            timeout_secs: 10,
            verify_tls: true,
            enable_filtering: false,
            custom_headers: serde_json::Value::Object(serde_json::Map::new()),
            created_by: None,
        }
    }
}

/// Partial update for an endpoint. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateEndpoint {
    pub name: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub http_method: Option<String>,
    pub content_type: Option<String>,
    pub secret_encrypted: Option<String>,
    pub signature_algorithm: Option<SignatureAlgorithm>,
    pub retry_strategy: Option<RetryStrategy>,
    pub retry_delay_secs: Option<i32>,
    pub max_attempts: Option<i32>,
    pub timeout_secs: Option<i32>,
    pub verify_tls: Option<bool>,
    pub enable_filtering: Option<bool>,
    pub custom_headers: Option<serde_json::Value>,
    pub active: Option<bool>,
}

/// Link between an endpoint and an event type it wants to receive.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct EndpointSubscription {
    pub id: Uuid,
    pub endpoint_id: Uuid,
    pub event_type_id: Uuid,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
