//! Common test utilities for hookline-webhooks integration tests.
//!
//! Provides an in-memory store wired to the real services, mock-server
//! responders, and fixtures for the billing event domain used across
//! the integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;
use uuid::Uuid;
use wiremock::{Request, Respond, ResponseTemplate};

use hookline_db::store::{MemoryStore, WebhookStore};
use hookline_webhooks::models::{
    CreateEndpointRequest, EndpointResponse, EventTypeResponse, RegisterEventTypeRequest,
    TriggerEventRequest, TriggerEventResponse,
};
use hookline_webhooks::validation::UrlPolicy;
use hookline_webhooks::{DeliveryService, EndpointService, EventService, EventTypeService};

/// Shared signing secret used by endpoint fixtures.
pub const TEST_SECRET: &str = "whsec_test_secret_key_12345";

/// AES key used to encrypt endpoint secrets in tests.
pub fn test_encryption_key() -> Vec<u8> {
    vec![0x42u8; 32]
}

// ---------------------------------------------------------------------------
// Harness - in-memory store + real services
// ---------------------------------------------------------------------------

/// All services wired to one in-memory store, with a URL policy that
/// accepts the mock server's plain-http loopback URLs.
pub struct Harness {
    pub store: Arc<dyn WebhookStore>,
    pub event_types: EventTypeService,
    pub endpoints: EndpointService,
    pub events: EventService,
    pub delivery: Arc<DeliveryService>,
}

impl Harness {
    pub fn new() -> Self {
        let store: Arc<dyn WebhookStore> = Arc::new(MemoryStore::new());
        let policy = UrlPolicy {
            allow_http: true,
            allow_private_hosts: true,
        };
        Self {
            event_types: EventTypeService::new(store.clone()),
            endpoints: EndpointService::new(store.clone(), test_encryption_key())
                .with_url_policy(policy),
            events: EventService::new(store.clone()),
            delivery: Arc::new(
                DeliveryService::new(store.clone(), test_encryption_key()).with_url_policy(policy),
            ),
            store,
        }
    }

    /// Register the standard `invoice.paid` event type, requiring
    /// `invoice_id` and `amount` in the payload.
    pub async fn register_invoice_paid(&self) -> EventTypeResponse {
        self.event_types
            .register(RegisterEventTypeRequest {
                name: "invoice.paid".to_string(),
                category: "billing".to_string(),
                payload_schema: json!({"required": ["invoice_id", "amount"]}),
                sample_payload: Some(json!({"invoice_id": "inv_1", "amount": 100})),
            })
            .await
            .expect("register invoice.paid")
    }

    /// Create an endpoint subscribed to the given event types with the
    /// standard test secret and immediate retries.
    pub async fn create_endpoint(&self, url: &str, event_type_ids: Vec<Uuid>) -> EndpointResponse {
        self.endpoints
            .create_endpoint(endpoint_request(url, event_type_ids))
            .await
            .expect("create endpoint")
    }

    /// Trigger an `invoice.paid` event with the given payload.
    pub async fn trigger_invoice_paid(
        &self,
        payload: serde_json::Value,
    ) -> Result<TriggerEventResponse, hookline_webhooks::WebhookError> {
        self.events
            .trigger_event(TriggerEventRequest {
                event_type: "invoice.paid".to_string(),
                payload,
                triggered_by: None,
                customer_id: None,
                source_ip: None,
                user_agent: None,
            })
            .await
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an endpoint creation request with test defaults: signed,
/// immediate retries, 3 attempts, short timeout.
pub fn endpoint_request(url: &str, event_type_ids: Vec<Uuid>) -> CreateEndpointRequest {
    CreateEndpointRequest {
        name: "billing-sink".to_string(),
        description: None,
        url: url.to_string(),
        http_method: None,
        content_type: None,
        secret: Some(TEST_SECRET.to_string()),
        signature_algorithm: None,
        retry_strategy: Some(hookline_db::models::RetryStrategy::Immediate),
        retry_delay_secs: None,
        max_attempts: Some(3),
        timeout_secs: Some(5),
        verify_tls: None,
        enable_filtering: None,
        custom_headers: None,
        event_type_ids,
        created_by: None,
    }
}

/// Standard `invoice.paid` payload.
pub fn invoice_payload(invoice_id: &str, amount: i64) -> serde_json::Value {
    json!({
        "invoice_id": invoice_id,
        "amount": amount,
        "currency": "EUR"
    })
}

// ---------------------------------------------------------------------------
// CapturedRequest - for inspecting delivered requests
// ---------------------------------------------------------------------------

/// A captured HTTP request with body and headers.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub body: Vec<u8>,
    pub headers: HashMap<String, String>,
}

impl CapturedRequest {
    /// Parse the body as JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("delivered body is JSON")
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// CaptureResponder - captures requests and returns a fixed status
// ---------------------------------------------------------------------------

/// A wiremock responder that captures incoming requests.
#[derive(Clone)]
pub struct CaptureResponder {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    response_code: u16,
}

impl CaptureResponder {
    /// Create a new capture responder that returns 200 OK.
    pub fn new() -> Self {
        Self::with_status(200)
    }

    /// Create a capture responder that returns a custom status code.
    pub fn with_status(status: u16) -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            response_code: status,
        }
    }

    /// Get all captured requests.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Get the number of captured requests.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Default for CaptureResponder {
    fn default() -> Self {
        Self::new()
    }
}

impl Respond for CaptureResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let captured = CapturedRequest {
            body: request.body.clone(),
            headers: request
                .headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect(),
        };
        self.requests.lock().unwrap().push(captured);
        ResponseTemplate::new(self.response_code)
    }
}

// ---------------------------------------------------------------------------
// FailingResponder - fails N times then succeeds
// ---------------------------------------------------------------------------

/// A wiremock responder that fails a specified number of times before
/// succeeding.
#[derive(Clone)]
pub struct FailingResponder {
    attempt_count: Arc<AtomicU32>,
    failures_before_success: u32,
    failure_code: u16,
}

impl FailingResponder {
    /// Create a responder that fails `n` times with 500, then returns 200.
    pub fn fail_times(n: u32) -> Self {
        Self {
            attempt_count: Arc::new(AtomicU32::new(0)),
            failures_before_success: n,
            failure_code: 500,
        }
    }

    /// Create a responder that fails with a custom status code.
    pub fn fail_with_status(n: u32, failure_code: u16) -> Self {
        Self {
            attempt_count: Arc::new(AtomicU32::new(0)),
            failures_before_success: n,
            failure_code,
        }
    }

    /// Get the current attempt count.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count.load(Ordering::SeqCst)
    }
}

impl Respond for FailingResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.attempt_count.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            ResponseTemplate::new(self.failure_code)
        } else {
            ResponseTemplate::new(200)
        }
    }
}

// ---------------------------------------------------------------------------
// DelayedResponder - adds response delay
// ---------------------------------------------------------------------------

/// A wiremock responder that delays before responding, for timeout tests.
#[derive(Clone)]
pub struct DelayedResponder {
    delay_ms: u64,
}

impl DelayedResponder {
    pub fn new(delay_ms: u64) -> Self {
        Self { delay_ms }
    }
}

impl Respond for DelayedResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        ResponseTemplate::new(200).set_delay(std::time::Duration::from_millis(self.delay_ms))
    }
}

/// Drive the delivery engine by hand: claim everything due and execute
/// each claimed delivery, returning how many were executed.
pub async fn drain_due(harness: &Harness) -> usize {
    let due = harness
        .store
        .claim_due_deliveries(100, chrono::Duration::seconds(60))
        .await
        .expect("claim due deliveries");
    let count = due.len();
    for delivery in &due {
        harness
            .delivery
            .execute_delivery(delivery)
            .await
            .expect("execute delivery");
    }
    count
}
