//! Axum router setup for the webhook admin API.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use hookline_db::store::WebhookStore;

use crate::handlers::{deliveries, endpoints, event_types, events};
use crate::services::delivery::DeliveryService;
use crate::services::endpoints::EndpointService;
use crate::services::event_types::EventTypeService;
use crate::services::events::EventService;
use crate::validation::UrlPolicy;

/// Shared state for webhook handlers.
#[derive(Clone)]
pub struct WebhooksState {
    pub event_type_service: Arc<EventTypeService>,
    pub endpoint_service: Arc<EndpointService>,
    pub event_service: Arc<EventService>,
    pub delivery_service: Arc<DeliveryService>,
}

impl WebhooksState {
    /// Create a new webhooks state with the default URL policy.
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, encryption_key: Vec<u8>) -> Self {
        Self::with_url_policy(store, encryption_key, UrlPolicy::default())
    }

    /// Create a new webhooks state with an explicit URL policy.
    #[must_use]
    pub fn with_url_policy(
        store: Arc<dyn WebhookStore>,
        encryption_key: Vec<u8>,
        url_policy: UrlPolicy,
    ) -> Self {
        Self {
            event_type_service: Arc::new(EventTypeService::new(store.clone())),
            endpoint_service: Arc::new(
                EndpointService::new(store.clone(), encryption_key.clone())
                    .with_url_policy(url_policy),
            ),
            event_service: Arc::new(EventService::new(store.clone())),
            delivery_service: Arc::new(
                DeliveryService::new(store, encryption_key).with_url_policy(url_policy),
            ),
        }
    }
}

/// Creates the webhook router with all routes.
pub fn webhooks_router(state: WebhooksState) -> Router {
    Router::new()
        // Event type registry
        .route(
            "/webhooks/event-types",
            post(event_types::register_event_type_handler)
                .get(event_types::list_event_types_handler),
        )
        .route(
            "/webhooks/event-types/:name",
            get(event_types::get_event_type_handler)
                .patch(event_types::set_event_type_active_handler),
        )
        // Endpoint CRUD
        .route(
            "/webhooks/endpoints",
            post(endpoints::create_endpoint_handler).get(endpoints::list_endpoints_handler),
        )
        .route(
            "/webhooks/endpoints/:id",
            get(endpoints::get_endpoint_handler)
                .patch(endpoints::update_endpoint_handler)
                .delete(endpoints::delete_endpoint_handler),
        )
        // Payload filters
        .route(
            "/webhooks/endpoints/:id/filters",
            post(endpoints::create_filter_handler).get(endpoints::list_filters_handler),
        )
        .route(
            "/webhooks/endpoints/:id/filters/:filter_id",
            axum::routing::delete(endpoints::delete_filter_handler),
        )
        // Test runner
        .route(
            "/webhooks/endpoints/:id/test",
            post(endpoints::test_endpoint_handler),
        )
        // Event ingress and search
        .route(
            "/webhooks/events",
            post(events::trigger_event_handler).get(events::search_events_handler),
        )
        .route("/webhooks/events/:id", get(events::get_event_handler))
        // Delivery history
        .route(
            "/webhooks/deliveries",
            get(deliveries::search_deliveries_handler),
        )
        .route(
            "/webhooks/deliveries/:id",
            get(deliveries::get_delivery_handler),
        )
        .route(
            "/webhooks/deliveries/:id/attempts",
            get(deliveries::list_attempts_handler),
        )
        .with_state(state)
}
