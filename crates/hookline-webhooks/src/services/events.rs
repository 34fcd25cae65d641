//! Event ingress and dispatch.
//!
//! `trigger_event` validates and persists an event, then fans it out to
//! matching endpoints as PENDING delivery rows. No network I/O happens
//! here; the delivery worker picks the rows up asynchronously.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use hookline_db::models::{new_event_id, CreateDelivery, CreateEvent, Delivery, Event};
use hookline_db::store::{EventQuery, WebhookStore};

use crate::error::WebhookError;
use crate::filter::evaluate_filters;
use crate::models::{
    DeliveryResponse, EventResponse, SearchEventsQuery, TriggerEventRequest, TriggerEventResponse,
};
use crate::services::event_types::validate_payload;

/// Service for triggering and querying events.
#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn WebhookStore>,
}

impl EventService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>) -> Self {
        Self { store }
    }

    /// Validate, persist and dispatch an event.
    ///
    /// Fails with `Validation` when the event type is unknown or
    /// inactive, or when the payload misses required fields. Dispatch
    /// creates one PENDING delivery per matching endpoint; an endpoint
    /// that already has a delivery for this event is skipped.
    pub async fn trigger_event(
        &self,
        request: TriggerEventRequest,
    ) -> Result<TriggerEventResponse, WebhookError> {
        let event_type = self
            .store
            .find_event_type_by_name(&request.event_type)
            .await?
            .ok_or_else(|| {
                WebhookError::Validation(format!("Unknown event type: {}", request.event_type))
            })?;

        if !event_type.active {
            return Err(WebhookError::Validation(format!(
                "Event type is inactive: {}",
                event_type.name
            )));
        }

        validate_payload(&event_type, &request.payload)?;

        let event = self
            .store
            .insert_event(CreateEvent {
                event_id: new_event_id(),
                event_type_id: event_type.id,
                event_type: event_type.name.clone(),
                payload: request.payload,
                occurred_at: Utc::now(),
                triggered_by: request.triggered_by,
                customer_id: request.customer_id,
                source_ip: request.source_ip,
                user_agent: request.user_agent,
            })
            .await?;

        let deliveries = self.process_event(&event).await?;

        self.store.mark_event_processed(event.id).await?;

        tracing::info!(
            target: "webhook_dispatch",
            event_id = %event.event_id,
            event_type = %event.event_type,
            delivery_count = deliveries.len(),
            "Event dispatched"
        );

        Ok(TriggerEventResponse {
            event: {
                let mut response = EventResponse::from(event);
                response.processed = true;
                response
            },
            deliveries: deliveries.into_iter().map(Into::into).collect(),
        })
    }

    /// Fan an event out to every matching endpoint.
    ///
    /// An endpoint matches when it is active, holds an active
    /// subscription to the event type, and its filters (when filtering
    /// is enabled) accept the payload.
    async fn process_event(&self, event: &Event) -> Result<Vec<Delivery>, WebhookError> {
        let endpoints = self
            .store
            .endpoints_for_event_type(event.event_type_id)
            .await?;

        let mut deliveries = Vec::new();
        for endpoint in endpoints {
            if endpoint.enable_filtering {
                let filters = self.store.list_filters(endpoint.id).await?;
                if !evaluate_filters(&filters, &event.payload) {
                    tracing::debug!(
                        target: "webhook_dispatch",
                        event_id = %event.event_id,
                        endpoint_id = %endpoint.id,
                        "Payload filtered out"
                    );
                    continue;
                }
            }

            let created = self
                .store
                .insert_delivery(CreateDelivery {
                    event_id: event.id,
                    endpoint_id: endpoint.id,
                    max_attempts: endpoint.max_attempts,
                    scheduled_at: Utc::now(),
                })
                .await?;

            match created {
                Some(delivery) => deliveries.push(delivery),
                None => {
                    tracing::debug!(
                        target: "webhook_dispatch",
                        event_id = %event.event_id,
                        endpoint_id = %endpoint.id,
                        "Delivery already exists, skipping"
                    );
                }
            }
        }

        Ok(deliveries)
    }

    /// Get one event by id.
    pub async fn get_event(&self, id: Uuid) -> Result<EventResponse, WebhookError> {
        let event = self
            .store
            .find_event(id)
            .await?
            .ok_or(WebhookError::EventNotFound)?;
        Ok(event.into())
    }

    /// Search events by type, processed flag, actor and time range.
    pub async fn search_events(
        &self,
        query: SearchEventsQuery,
    ) -> Result<Vec<EventResponse>, WebhookError> {
        let event_type_id = match query.event_type {
            Some(ref name) => Some(
                self.store
                    .find_event_type_by_name(name)
                    .await?
                    .ok_or(WebhookError::EventTypeNotFound)?
                    .id,
            ),
            None => None,
        };

        let defaults = EventQuery::default();
        let events = self
            .store
            .search_events(EventQuery {
                event_type_id,
                processed: query.processed,
                occurred_from: query.occurred_after,
                occurred_to: query.occurred_before,
                triggered_by: query.triggered_by,
                customer_id: query.customer_id,
                limit: query.limit.unwrap_or(defaults.limit).clamp(1, 100),
                offset: query.offset.unwrap_or(0).max(0),
            })
            .await?;

        Ok(events.into_iter().map(Into::into).collect())
    }
}
