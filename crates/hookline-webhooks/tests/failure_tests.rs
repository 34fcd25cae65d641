//! Failure handling edge cases: deleted endpoints, timeouts,
//! connection errors, and response body truncation.

mod common;

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{drain_due, invoice_payload, DelayedResponder, Harness};
use hookline_db::models::DeliveryStatus;

#[tokio::test]
async fn deleted_endpoint_fails_delivery_without_an_attempt() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;

    let response = h
        .trigger_invoice_paid(invoice_payload("inv_500", 10))
        .await
        .unwrap();
    let delivery_id = response.deliveries[0].id;

    // Endpoint disappears before the worker gets to the delivery.
    h.endpoints.delete_endpoint(endpoint.id).await.unwrap();

    assert_eq!(drain_due(&h).await, 1);

    let delivery = h.store.find_delivery(delivery_id).await.unwrap().unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert!(delivery
        .last_error
        .as_deref()
        .unwrap()
        .starts_with("endpoint_missing"));

    // No request was made, so no attempt row exists.
    let attempts = h.store.list_attempts(delivery_id).await.unwrap();
    assert!(attempts.is_empty());
}

#[tokio::test]
async fn deactivated_endpoint_still_drains_in_flight_deliveries() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;
    let response = h
        .trigger_invoice_paid(invoice_payload("inv_501", 10))
        .await
        .unwrap();
    let delivery_id = response.deliveries[0].id;

    // Deactivation stops new dispatch but not already-created deliveries.
    h.endpoints
        .update_endpoint(
            endpoint.id,
            hookline_webhooks::models::UpdateEndpointRequest {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(drain_due(&h).await, 1);
    let delivery = h.store.find_delivery(delivery_id).await.unwrap().unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);
}

#[tokio::test]
async fn slow_receiver_is_recorded_as_timeout() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(DelayedResponder::new(2500))
        .mount(&server)
        .await;

    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.timeout_secs = Some(1);
    request.max_attempts = Some(1);
    h.endpoints.create_endpoint(request).await.unwrap();

    let response = h
        .trigger_invoice_paid(invoice_payload("inv_502", 10))
        .await
        .unwrap();
    let delivery_id = response.deliveries[0].id;

    assert_eq!(drain_due(&h).await, 1);

    let delivery = h.store.find_delivery(delivery_id).await.unwrap().unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Failed);
    assert_eq!(delivery.last_response_code, None);

    let attempts = h.store.list_attempts(delivery_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].is_successful);
    assert_eq!(attempts[0].error_type.as_deref(), Some("timeout"));
    assert!(attempts[0].response_code.is_none());
}

#[tokio::test]
async fn unreachable_host_is_recorded_as_connection_error() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    // Bind a listener just to learn a free port, then close it so
    // nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let uri = format!("http://127.0.0.1:{port}");

    let mut request = common::endpoint_request(&uri, vec![event_type.id]);
    request.max_attempts = Some(1);
    h.endpoints.create_endpoint(request).await.unwrap();

    let response = h
        .trigger_invoice_paid(invoice_payload("inv_503", 10))
        .await
        .unwrap();
    let delivery_id = response.deliveries[0].id;

    assert_eq!(drain_due(&h).await, 1);

    let attempts = h.store.list_attempts(delivery_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert!(!attempts[0].is_successful);
    assert_eq!(attempts[0].error_type.as_deref(), Some("connection"));
}

#[tokio::test]
async fn long_response_bodies_are_truncated_in_attempts() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let long_body = "x".repeat(10_000);
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(long_body))
        .mount(&server)
        .await;

    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.max_attempts = Some(1);
    h.endpoints.create_endpoint(request).await.unwrap();

    let response = h
        .trigger_invoice_paid(invoice_payload("inv_504", 10))
        .await
        .unwrap();
    let delivery_id = response.deliveries[0].id;
    drain_due(&h).await;

    let attempts = h.store.list_attempts(delivery_id).await.unwrap();
    assert_eq!(attempts.len(), 1);
    let stored = attempts[0].response_body.as_deref().unwrap();
    assert_eq!(stored.chars().count(), 4096);
}
