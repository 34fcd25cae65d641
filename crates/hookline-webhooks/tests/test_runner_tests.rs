//! Ad-hoc endpoint test runner: sends one request with the endpoint's
//! configuration and reports the outcome without persisting anything.

mod common;

use serde_json::json;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{CaptureResponder, Harness, TEST_SECRET};
use hookline_db::store::DeliveryQuery;
use hookline_webhooks::crypto;
use hookline_webhooks::models::TestEndpointRequest;
use hookline_webhooks::WebhookError;

#[tokio::test]
async fn test_request_is_signed_and_reports_success() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let responder = CaptureResponder::new();
    Mock::given(method("POST"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;

    let result = h
        .delivery
        .test_endpoint(
            endpoint.id,
            TestEndpointRequest {
                payload: Some(json!({"ping": "pong"})),
                url_override: None,
            },
        )
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.status_code, Some(200));
    assert!(result.error.is_none());

    let requests = responder.requests();
    assert_eq!(requests.len(), 1);
    let body = requests[0].body_json();
    assert_eq!(body["event_type"], "endpoint.test");
    assert_eq!(body["data"]["ping"], "pong");
    assert_eq!(
        requests[0].header("x-webhook-event-type"),
        Some("endpoint.test")
    );
    // Test requests are signed like real deliveries.
    let header = requests[0].header("x-webhook-signature").unwrap();
    assert!(crypto::verify_signature_header(
        header,
        TEST_SECRET,
        &requests[0].body
    ));
    // But carry no delivery id, since no delivery exists.
    assert!(requests[0].header("x-webhook-delivery-id").is_none());
}

#[tokio::test]
async fn test_request_persists_nothing() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;
    h.delivery
        .test_endpoint(endpoint.id, TestEndpointRequest::default())
        .await
        .unwrap();

    let deliveries = h
        .store
        .search_deliveries(DeliveryQuery {
            endpoint_id: Some(endpoint.id),
            ..DeliveryQuery::default()
        })
        .await
        .unwrap();
    assert!(deliveries.is_empty());

    let updated = h.store.find_endpoint(endpoint.id).await.unwrap().unwrap();
    assert_eq!(updated.total_deliveries, 0);
}

#[tokio::test]
async fn failing_destination_is_reported_not_retried() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let responder = CaptureResponder::with_status(500);
    Mock::given(method("POST"))
        .respond_with(responder.clone())
        .mount(&server)
        .await;

    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;
    let result = h
        .delivery
        .test_endpoint(endpoint.id, TestEndpointRequest::default())
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.status_code, Some(500));
    assert!(result.error.is_some());
    // One shot only, regardless of the endpoint's retry policy.
    assert_eq!(responder.request_count(), 1);
}

#[tokio::test]
async fn url_override_is_validated() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;

    let err = h
        .delivery
        .test_endpoint(
            endpoint.id,
            TestEndpointRequest {
                payload: None,
                url_override: Some("ftp://example.com/hook".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::InvalidUrl(_)));
}

#[tokio::test]
async fn unknown_endpoint_is_rejected() {
    let h = Harness::new();

    let err = h
        .delivery
        .test_endpoint(uuid::Uuid::new_v4(), TestEndpointRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, WebhookError::EndpointNotFound));
}
