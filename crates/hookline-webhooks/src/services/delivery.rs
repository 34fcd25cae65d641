//! Webhook delivery execution.
//!
//! Executes one HTTP attempt per claimed delivery: builds the outbound
//! payload and signature, sends the request with the endpoint's policy
//! (method, timeout, TLS verification), records an attempt row, and
//! advances the delivery state machine (delivered / retrying / failed).

use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use hookline_db::models::{
    CreateDeliveryAttempt, Delivery, DeliveryAttempt, Endpoint, Event, RetryStrategy,
};
use hookline_db::store::{DeliveryQuery, WebhookStore};

use crate::crypto;
use crate::error::WebhookError;
use crate::models::{
    DeliveryAttemptResponse, DeliveryResponse, SearchDeliveriesQuery, TestEndpointRequest,
    TestEndpointResult,
};
use crate::validation::{self, UrlPolicy};

/// User agent sent on every outbound request.
pub const USER_AGENT: &str = "hookline-webhooks/1.0";

/// Retry delays never exceed one day regardless of strategy.
pub const MAX_RETRY_DELAY_SECS: i64 = 86_400;

/// Response bodies are truncated to this many characters before storage.
const MAX_RESPONSE_BODY_CHARS: usize = 4096;

/// Outcome of a single HTTP attempt, before state transitions.
struct AttemptOutcome {
    response_code: Option<i16>,
    response_headers: Option<Value>,
    response_body: Option<String>,
    latency_ms: i32,
    is_successful: bool,
    error_type: Option<String>,
    error_message: Option<String>,
}

/// Service executing webhook deliveries.
#[derive(Clone)]
pub struct DeliveryService {
    store: Arc<dyn WebhookStore>,
    encryption_key: Vec<u8>,
    url_policy: UrlPolicy,
}

impl DeliveryService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, encryption_key: Vec<u8>) -> Self {
        Self {
            store,
            encryption_key,
            url_policy: UrlPolicy::default(),
        }
    }

    /// Relax URL validation for test-runner overrides.
    #[must_use]
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Execute one attempt for a claimed delivery.
    ///
    /// A deactivated endpoint still receives its in-flight deliveries;
    /// a deleted one fails the delivery terminally.
    pub async fn execute_delivery(&self, delivery: &Delivery) -> Result<(), WebhookError> {
        let attempt_number = delivery.attempt_count + 1;

        let Some(endpoint) = self.store.find_endpoint(delivery.endpoint_id).await? else {
            tracing::warn!(
                target: "webhook_delivery",
                delivery_id = %delivery.id,
                endpoint_id = %delivery.endpoint_id,
                "Endpoint deleted, failing delivery"
            );
            self.store
                .mark_delivery_failed(
                    delivery.id,
                    delivery.attempt_count,
                    None,
                    "endpoint_missing: endpoint was deleted",
                )
                .await?;
            return Ok(());
        };

        let event = self
            .store
            .find_event(delivery.event_id)
            .await?
            .ok_or_else(|| {
                WebhookError::Internal(format!("Delivery {} references no event", delivery.id))
            })?;

        let body = serde_json::to_vec(&build_payload(&event))
            .map_err(|e| WebhookError::Internal(format!("Failed to serialize payload: {e}")))?;

        let headers = self.build_headers(&endpoint, &event, delivery.id, &body)?;
        let outcome = self
            .send_request(&endpoint, &endpoint.url, headers.clone(), body.clone())
            .await;

        self.store
            .insert_attempt(CreateDeliveryAttempt {
                delivery_id: delivery.id,
                attempt_number,
                request_url: endpoint.url.clone(),
                request_headers: headers_to_json(&headers),
                request_body_sha256: hex::encode(Sha256::digest(&body)),
                response_code: outcome.response_code,
                response_headers: outcome.response_headers.clone(),
                response_body: outcome.response_body.clone(),
                latency_ms: outcome.latency_ms,
                is_successful: outcome.is_successful,
                error_type: outcome.error_type.clone(),
                error_message: outcome.error_message.clone(),
            })
            .await?;

        if outcome.is_successful {
            // response_code is always Some on success
            let code = outcome.response_code.unwrap_or(200);
            self.store
                .mark_delivery_delivered(delivery.id, attempt_number, code)
                .await?;
            self.store
                .record_endpoint_delivery(endpoint.id, true)
                .await?;

            tracing::info!(
                target: "webhook_delivery",
                delivery_id = %delivery.id,
                endpoint_id = %endpoint.id,
                event_id = %event.event_id,
                response_code = code,
                latency_ms = outcome.latency_ms,
                attempt_number,
                "Webhook delivered"
            );
            return Ok(());
        }

        let error = outcome
            .error_message
            .as_deref()
            .unwrap_or("delivery failed");

        if attempt_number >= delivery.max_attempts {
            self.store
                .mark_delivery_failed(delivery.id, attempt_number, outcome.response_code, error)
                .await?;
            tracing::warn!(
                target: "webhook_delivery",
                delivery_id = %delivery.id,
                endpoint_id = %endpoint.id,
                event_id = %event.event_id,
                error,
                attempt_number,
                "Webhook delivery failed, attempts exhausted"
            );
        } else {
            let delay = calculate_retry_delay(
                endpoint.retry_strategy,
                i64::from(endpoint.retry_delay_secs),
                attempt_number,
            );
            let next_retry_at = Utc::now() + Duration::seconds(delay);
            self.store
                .mark_delivery_retrying(
                    delivery.id,
                    attempt_number,
                    next_retry_at,
                    outcome.response_code,
                    error,
                )
                .await?;
            tracing::warn!(
                target: "webhook_delivery",
                delivery_id = %delivery.id,
                endpoint_id = %endpoint.id,
                event_id = %event.event_id,
                error,
                attempt_number,
                retry_delay_secs = delay,
                "Webhook delivery failed, retry scheduled"
            );
        }

        self.store
            .record_endpoint_delivery(endpoint.id, false)
            .await?;
        Ok(())
    }

    /// Send one ad-hoc test request using the endpoint's configuration.
    ///
    /// Nothing is persisted; counters and delivery history are
    /// untouched.
    pub async fn test_endpoint(
        &self,
        endpoint_id: Uuid,
        request: TestEndpointRequest,
    ) -> Result<TestEndpointResult, WebhookError> {
        let endpoint = self
            .store
            .find_endpoint(endpoint_id)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;

        let url = match request.url_override {
            Some(url) => {
                validation::validate_destination_url(&url, self.url_policy)?;
                url
            }
            None => endpoint.url.clone(),
        };

        let payload = request.payload.unwrap_or_else(|| json!({"test": true}));
        let now = Utc::now();
        let event_id = hookline_db::models::new_event_id();
        let envelope = json!({
            "event_id": event_id,
            "event_type": "endpoint.test",
            "occurred_at": now,
            "data": payload,
            "metadata": {},
        });
        let body = serde_json::to_vec(&envelope)
            .map_err(|e| WebhookError::Internal(format!("Failed to serialize payload: {e}")))?;

        let mut headers = self.base_headers(&endpoint, &body)?;
        insert_header(&mut headers, "X-Webhook-Event-ID", &event_id)?;
        insert_header(&mut headers, "X-Webhook-Event-Type", "endpoint.test")?;

        let outcome = self.send_request(&endpoint, &url, headers, body).await;

        Ok(TestEndpointResult {
            success: outcome.is_successful,
            status_code: outcome.response_code.map(|c| c as u16),
            latency_ms: outcome.latency_ms,
            response_body: outcome.response_body,
            error: outcome.error_message.filter(|_| !outcome.is_successful),
        })
    }

    /// Get one delivery by id.
    pub async fn get_delivery(&self, id: Uuid) -> Result<DeliveryResponse, WebhookError> {
        let delivery = self
            .store
            .find_delivery(id)
            .await?
            .ok_or(WebhookError::DeliveryNotFound)?;
        Ok(delivery.into())
    }

    /// Search deliveries by endpoint, event, status, attempts and time.
    pub async fn search_deliveries(
        &self,
        query: SearchDeliveriesQuery,
    ) -> Result<Vec<DeliveryResponse>, WebhookError> {
        let defaults = DeliveryQuery::default();
        let deliveries = self
            .store
            .search_deliveries(DeliveryQuery {
                endpoint_id: query.endpoint_id,
                event_id: query.event_id,
                status: query.status,
                min_attempts: query.min_attempts,
                max_attempts: query.max_attempts,
                created_from: query.created_after,
                created_to: query.created_before,
                limit: query.limit.unwrap_or(defaults.limit).clamp(1, 100),
                offset: query.offset.unwrap_or(0).max(0),
            })
            .await?;
        Ok(deliveries.into_iter().map(Into::into).collect())
    }

    /// List the attempt history of one delivery.
    pub async fn list_attempts(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<DeliveryAttemptResponse>, WebhookError> {
        if self.store.find_delivery(delivery_id).await?.is_none() {
            return Err(WebhookError::DeliveryNotFound);
        }
        let attempts: Vec<DeliveryAttempt> = self.store.list_attempts(delivery_id).await?;
        Ok(attempts.into_iter().map(Into::into).collect())
    }

    // --- request plumbing ------------------------------------------------

    /// Content type, user agent, custom headers and signature.
    fn base_headers(
        &self,
        endpoint: &Endpoint,
        body: &[u8],
    ) -> Result<reqwest::header::HeaderMap, WebhookError> {
        let mut headers = reqwest::header::HeaderMap::new();
        insert_header(&mut headers, "Content-Type", &endpoint.content_type)?;
        insert_header(&mut headers, "User-Agent", USER_AGENT)?;

        if let Some(custom) = endpoint.custom_headers.as_object() {
            for (name, value) in custom {
                if let Some(value) = value.as_str() {
                    insert_header(&mut headers, name, value)?;
                }
            }
        }

        if let Some(ref secret_encrypted) = endpoint.secret_encrypted {
            let secret = crypto::decrypt_secret(secret_encrypted, &self.encryption_key)?;
            let header = crypto::signature_header(endpoint.signature_algorithm, &secret, body);
            insert_header(&mut headers, "X-Webhook-Signature", &header)?;
        }

        Ok(headers)
    }

    fn build_headers(
        &self,
        endpoint: &Endpoint,
        event: &Event,
        delivery_id: Uuid,
        body: &[u8],
    ) -> Result<reqwest::header::HeaderMap, WebhookError> {
        let mut headers = self.base_headers(endpoint, body)?;
        insert_header(&mut headers, "X-Webhook-Event-ID", &event.event_id)?;
        insert_header(&mut headers, "X-Webhook-Event-Type", &event.event_type)?;
        insert_header(
            &mut headers,
            "X-Webhook-Delivery-ID",
            &delivery_id.to_string(),
        )?;
        Ok(headers)
    }

    /// One HTTP round trip with the endpoint's timeout and TLS policy.
    async fn send_request(
        &self,
        endpoint: &Endpoint,
        url: &str,
        headers: reqwest::header::HeaderMap,
        body: Vec<u8>,
    ) -> AttemptOutcome {
        let timeout = std::time::Duration::from_secs(endpoint.timeout_secs.max(1) as u64);
        let client = match reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(!endpoint.verify_tls)
            .redirect(reqwest::redirect::Policy::none())
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                return AttemptOutcome {
                    response_code: None,
                    response_headers: None,
                    response_body: None,
                    latency_ms: 0,
                    is_successful: false,
                    error_type: Some("request".to_string()),
                    error_message: Some(format!("Failed to build HTTP client: {e}")),
                };
            }
        };

        let method = match endpoint.http_method.to_uppercase().as_str() {
            "PUT" => reqwest::Method::PUT,
            "PATCH" => reqwest::Method::PATCH,
            _ => reqwest::Method::POST,
        };

        let start = Instant::now();
        let result = client
            .request(method, url)
            .headers(headers)
            .body(body)
            .send()
            .await;
        let latency_ms = start.elapsed().as_millis() as i32;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                let response_headers = response_headers_to_json(response.headers());
                let body = response
                    .text()
                    .await
                    .unwrap_or_default()
                    .chars()
                    .take(MAX_RESPONSE_BODY_CHARS)
                    .collect::<String>();
                let is_successful = (200..300).contains(&status);

                AttemptOutcome {
                    response_code: Some(status as i16),
                    response_headers: Some(response_headers),
                    response_body: Some(body),
                    latency_ms,
                    is_successful,
                    error_type: (!is_successful).then(|| "http_status".to_string()),
                    error_message: (!is_successful).then(|| format!("HTTP {status}")),
                }
            }
            Err(e) => {
                let (error_type, error_message) = if e.is_timeout() {
                    (
                        "timeout",
                        format!("Request timeout ({}s)", endpoint.timeout_secs),
                    )
                } else if e.is_connect() {
                    ("connection", format!("Connection failed: {e}"))
                } else {
                    ("request", format!("Request error: {e}"))
                };

                AttemptOutcome {
                    response_code: None,
                    response_headers: None,
                    response_body: None,
                    latency_ms,
                    is_successful: false,
                    error_type: Some(error_type.to_string()),
                    error_message: Some(error_message),
                }
            }
        }
    }
}

/// The outbound envelope wrapping the stored event payload.
fn build_payload(event: &Event) -> Value {
    let mut metadata = serde_json::Map::new();
    if let Some(triggered_by) = event.triggered_by {
        metadata.insert("triggered_by".to_string(), json!(triggered_by));
    }
    if let Some(customer_id) = event.customer_id {
        metadata.insert("customer_id".to_string(), json!(customer_id));
    }

    json!({
        "event_id": event.event_id,
        "event_type": event.event_type,
        "occurred_at": event.occurred_at,
        "data": event.payload,
        "metadata": Value::Object(metadata),
    })
}

/// Seconds to wait before the given attempt is retried.
///
/// `attempt` is the attempt that just failed (1-based). All strategies
/// are capped at [`MAX_RETRY_DELAY_SECS`].
#[must_use]
pub fn calculate_retry_delay(strategy: RetryStrategy, base_secs: i64, attempt: i32) -> i64 {
    let attempt = i64::from(attempt.max(1));
    let delay = match strategy {
        RetryStrategy::Immediate => 0,
        RetryStrategy::Fixed => base_secs,
        RetryStrategy::Linear => base_secs.saturating_mul(attempt),
        RetryStrategy::Exponential => {
            let exponent = u32::try_from(attempt - 1).unwrap_or(u32::MAX).min(62);
            base_secs.saturating_mul(1_i64 << exponent)
        }
    };
    delay.clamp(0, MAX_RETRY_DELAY_SECS)
}

fn insert_header(
    headers: &mut reqwest::header::HeaderMap,
    name: &str,
    value: &str,
) -> Result<(), WebhookError> {
    let name = reqwest::header::HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| WebhookError::Validation(format!("Invalid header name {name}: {e}")))?;
    let value = reqwest::header::HeaderValue::from_str(value)
        .map_err(|e| WebhookError::Validation(format!("Invalid header value for {name}: {e}")))?;
    headers.insert(name, value);
    Ok(())
}

fn headers_to_json(headers: &reqwest::header::HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        if let Ok(v) = value.to_str() {
            // The signature is derivable from the secret; keep it out of
            // stored attempt rows.
            if name.as_str().eq_ignore_ascii_case("x-webhook-signature") {
                map.insert(name.to_string(), Value::String("<redacted>".to_string()));
            } else {
                map.insert(name.to_string(), Value::String(v.to_string()));
            }
        }
    }
    Value::Object(map)
}

fn response_headers_to_json(headers: &reqwest::header::HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for (name, value) in headers {
        if let Ok(v) = value.to_str() {
            map.insert(name.to_string(), Value::String(v.to_string()));
        }
    }
    Value::Object(map)
}
