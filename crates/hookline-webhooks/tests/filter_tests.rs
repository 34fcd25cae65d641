//! Payload filters gate dispatch: with filtering enabled, an endpoint
//! only receives deliveries for payloads its active filters accept.

mod common;

use serde_json::json;
use wiremock::MockServer;

use common::{invoice_payload, Harness};
use hookline_db::models::FilterOperator;
use hookline_webhooks::models::CreateFilterRequest;

#[tokio::test]
async fn gte_filter_drops_small_amounts() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.enable_filtering = Some(true);
    let endpoint = h.endpoints.create_endpoint(request).await.unwrap();

    h.endpoints
        .create_filter(
            endpoint.id,
            CreateFilterRequest {
                field_path: "amount".to_string(),
                operator: FilterOperator::Gte,
                value: json!(100),
                include_on_match: true,
            },
        )
        .await
        .unwrap();

    let small = h
        .trigger_invoice_paid(invoice_payload("inv_400", 50))
        .await
        .unwrap();
    assert!(small.deliveries.is_empty(), "amount below threshold");

    let large = h
        .trigger_invoice_paid(invoice_payload("inv_401", 250))
        .await
        .unwrap();
    assert_eq!(large.deliveries.len(), 1, "amount at or above threshold");
}

#[tokio::test]
async fn exclude_on_match_inverts_the_filter() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.enable_filtering = Some(true);
    let endpoint = h.endpoints.create_endpoint(request).await.unwrap();

    // Drop EUR invoices, keep everything else.
    h.endpoints
        .create_filter(
            endpoint.id,
            CreateFilterRequest {
                field_path: "currency".to_string(),
                operator: FilterOperator::Equals,
                value: json!("EUR"),
                include_on_match: false,
            },
        )
        .await
        .unwrap();

    let eur = h
        .trigger_invoice_paid(invoice_payload("inv_402", 10))
        .await
        .unwrap();
    assert!(eur.deliveries.is_empty());

    let usd = h
        .trigger_invoice_paid(json!({
            "invoice_id": "inv_403",
            "amount": 10,
            "currency": "USD"
        }))
        .await
        .unwrap();
    assert_eq!(usd.deliveries.len(), 1);
}

#[tokio::test]
async fn missing_filter_path_fails_closed() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.enable_filtering = Some(true);
    let endpoint = h.endpoints.create_endpoint(request).await.unwrap();

    h.endpoints
        .create_filter(
            endpoint.id,
            CreateFilterRequest {
                field_path: "customer.tier".to_string(),
                operator: FilterOperator::Equals,
                value: json!("gold"),
                include_on_match: true,
            },
        )
        .await
        .unwrap();

    // The payload has no customer.tier, so an include filter drops it.
    let response = h
        .trigger_invoice_paid(invoice_payload("inv_404", 10))
        .await
        .unwrap();
    assert!(response.deliveries.is_empty());
}

#[tokio::test]
async fn filtering_disabled_ignores_configured_filters() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    // Fixture default: enable_filtering is off.
    let endpoint = h.create_endpoint(&server.uri(), vec![event_type.id]).await;

    h.endpoints
        .create_filter(
            endpoint.id,
            CreateFilterRequest {
                field_path: "amount".to_string(),
                operator: FilterOperator::Gte,
                value: json!(1_000_000),
                include_on_match: true,
            },
        )
        .await
        .unwrap();

    let response = h
        .trigger_invoice_paid(invoice_payload("inv_405", 1))
        .await
        .unwrap();
    assert_eq!(response.deliveries.len(), 1);
}

#[tokio::test]
async fn deleting_a_filter_reopens_dispatch() {
    let h = Harness::new();
    let event_type = h.register_invoice_paid().await;

    let server = MockServer::start().await;
    let mut request = common::endpoint_request(&server.uri(), vec![event_type.id]);
    request.enable_filtering = Some(true);
    let endpoint = h.endpoints.create_endpoint(request).await.unwrap();

    let filter = h
        .endpoints
        .create_filter(
            endpoint.id,
            CreateFilterRequest {
                field_path: "amount".to_string(),
                operator: FilterOperator::Gte,
                value: json!(1000),
                include_on_match: true,
            },
        )
        .await
        .unwrap();

    let blocked = h
        .trigger_invoice_paid(invoice_payload("inv_406", 10))
        .await
        .unwrap();
    assert!(blocked.deliveries.is_empty());

    h.endpoints
        .delete_filter(endpoint.id, filter.id)
        .await
        .unwrap();

    let allowed = h
        .trigger_invoice_paid(invoice_payload("inv_407", 10))
        .await
        .unwrap();
    assert_eq!(allowed.deliveries.len(), 1);
}
