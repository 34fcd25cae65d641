//! In-memory `WebhookStore` used by tests and embedded deployments.
//!
//! Mirrors the Postgres implementation's dedupe and claim-lease
//! semantics; all state lives behind a single `RwLock` so the claim
//! step is atomic by construction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    CreateDelivery, CreateDeliveryAttempt, CreateEndpoint, CreateEvent, CreateEventType,
    CreateFilter, Delivery, DeliveryAttempt, DeliveryStatus, Endpoint, EndpointFilter,
    EndpointSubscription, Event, EventType, UpdateEndpoint,
};
use crate::store::{
    DeliveryQuery, EndpointQuery, EventQuery, EventTypeQuery, WebhookStore,
};

#[derive(Default)]
struct Inner {
    event_types: HashMap<Uuid, EventType>,
    endpoints: HashMap<Uuid, Endpoint>,
    subscriptions: HashMap<Uuid, EndpointSubscription>,
    filters: HashMap<Uuid, EndpointFilter>,
    events: HashMap<Uuid, Event>,
    deliveries: HashMap<Uuid, Delivery>,
    attempts: Vec<DeliveryAttempt>,
}

/// In-memory store. Cheap to clone via `Arc`.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WebhookStore for MemoryStore {
    async fn insert_event_type(&self, input: CreateEventType) -> Result<EventType, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.event_types.values().any(|et| et.name == input.name) {
            return Err(StoreError::Duplicate {
                entity: "event type",
                value: input.name,
            });
        }
        let now = Utc::now();
        let event_type = EventType {
            id: Uuid::new_v4(),
            name: input.name,
            category: input.category,
            payload_schema: input.payload_schema,
            sample_payload: input.sample_payload,
            active: true,
            created_at: now,
            updated_at: now,
        };
        inner.event_types.insert(event_type.id, event_type.clone());
        Ok(event_type)
    }

    async fn find_event_type(&self, id: Uuid) -> Result<Option<EventType>, StoreError> {
        Ok(self.inner.read().await.event_types.get(&id).cloned())
    }

    async fn find_event_type_by_name(&self, name: &str) -> Result<Option<EventType>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .event_types
            .values()
            .find(|et| et.name == name)
            .cloned())
    }

    async fn list_event_types(&self, query: EventTypeQuery) -> Result<Vec<EventType>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<EventType> = inner
            .event_types
            .values()
            .filter(|et| {
                query
                    .category
                    .as_ref()
                    .is_none_or(|c| &et.category == c)
            })
            .filter(|et| query.active.is_none_or(|a| et.active == a))
            .cloned()
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn set_event_type_active(&self, id: Uuid, active: bool) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.event_types.get_mut(&id) {
            Some(et) => {
                et.active = active;
                et.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_endpoint(
        &self,
        input: CreateEndpoint,
        event_type_ids: Vec<Uuid>,
    ) -> Result<Endpoint, StoreError> {
        let mut inner = self.inner.write().await;
        for et_id in &event_type_ids {
            if !inner.event_types.contains_key(et_id) {
                return Err(StoreError::MissingReference {
                    entity: "event type",
                });
            }
        }
        let now = Utc::now();
        let endpoint = Endpoint {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            url: input.url,
            http_method: input.http_method,
            content_type: input.content_type,
            secret_encrypted: input.secret_encrypted,
            signature_algorithm: input.signature_algorithm,
            retry_strategy: input.retry_strategy,
            retry_delay_secs: input.retry_delay_secs,
            max_attempts: input.max_attempts,
            timeout_secs: input.timeout_secs,
            verify_tls: input.verify_tls,
            enable_filtering: input.enable_filtering,
            custom_headers: input.custom_headers,
            total_deliveries: 0,
            successful_deliveries: 0,
            failed_deliveries: 0,
            last_delivery_at: None,
            last_success_at: None,
            last_failure_at: None,
            active: true,
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        inner.endpoints.insert(endpoint.id, endpoint.clone());
        for et_id in event_type_ids {
            let sub = EndpointSubscription {
                id: Uuid::new_v4(),
                endpoint_id: endpoint.id,
                event_type_id: et_id,
                active: true,
                created_at: now,
            };
            inner.subscriptions.insert(sub.id, sub);
        }
        Ok(endpoint)
    }

    async fn find_endpoint(&self, id: Uuid) -> Result<Option<Endpoint>, StoreError> {
        Ok(self.inner.read().await.endpoints.get(&id).cloned())
    }

    async fn list_endpoints(&self, query: EndpointQuery) -> Result<Vec<Endpoint>, StoreError> {
        let inner = self.inner.read().await;
        let needle = query.name_contains.map(|n| n.to_lowercase());
        let mut out: Vec<Endpoint> = inner
            .endpoints
            .values()
            .filter(|ep| query.active.is_none_or(|a| ep.active == a))
            .filter(|ep| {
                needle
                    .as_deref()
                    .is_none_or(|n| ep.name.to_lowercase().contains(n))
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let start = usize::try_from(query.offset).unwrap_or(0).min(out.len());
        let end = (start + usize::try_from(query.limit).unwrap_or(0)).min(out.len());
        Ok(out[start..end].to_vec())
    }

    async fn count_endpoints(&self, query: EndpointQuery) -> Result<i64, StoreError> {
        let inner = self.inner.read().await;
        let needle = query.name_contains.map(|n| n.to_lowercase());
        let count = inner
            .endpoints
            .values()
            .filter(|ep| query.active.is_none_or(|a| ep.active == a))
            .filter(|ep| {
                needle
                    .as_deref()
                    .is_none_or(|n| ep.name.to_lowercase().contains(n))
            })
            .count();
        Ok(count as i64)
    }

    async fn update_endpoint(
        &self,
        id: Uuid,
        update: UpdateEndpoint,
    ) -> Result<Option<Endpoint>, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(ep) = inner.endpoints.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(v) = update.name {
            ep.name = v;
        }
        if let Some(v) = update.description {
            ep.description = Some(v);
        }
        if let Some(v) = update.url {
            ep.url = v;
        }
        if let Some(v) = update.http_method {
            ep.http_method = v;
        }
        if let Some(v) = update.content_type {
            ep.content_type = v;
        }
        if let Some(v) = update.secret_encrypted {
            ep.secret_encrypted = Some(v);
        }
        if let Some(v) = update.signature_algorithm {
            ep.signature_algorithm = v;
        }
        if let Some(v) = update.retry_strategy {
            ep.retry_strategy = v;
        }
        if let Some(v) = update.retry_delay_secs {
            ep.retry_delay_secs = v;
        }
        if let Some(v) = update.max_attempts {
            ep.max_attempts = v;
        }
        if let Some(v) = update.timeout_secs {
            ep.timeout_secs = v;
        }
        if let Some(v) = update.verify_tls {
            ep.verify_tls = v;
        }
        if let Some(v) = update.enable_filtering {
            ep.enable_filtering = v;
        }
        if let Some(v) = update.custom_headers {
            ep.custom_headers = v;
        }
        if let Some(v) = update.active {
            ep.active = v;
        }
        ep.updated_at = Utc::now();
        Ok(Some(ep.clone()))
    }

    async fn delete_endpoint(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.endpoints.remove(&id).is_none() {
            return Ok(false);
        }
        inner.subscriptions.retain(|_, s| s.endpoint_id != id);
        inner.filters.retain(|_, f| f.endpoint_id != id);
        Ok(true)
    }

    async fn list_subscriptions(
        &self,
        endpoint_id: Uuid,
    ) -> Result<Vec<EndpointSubscription>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<EndpointSubscription> = inner
            .subscriptions
            .values()
            .filter(|s| s.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn set_subscription_active(
        &self,
        endpoint_id: Uuid,
        event_type_id: Uuid,
        active: bool,
    ) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        for sub in inner.subscriptions.values_mut() {
            if sub.endpoint_id == endpoint_id && sub.event_type_id == event_type_id {
                sub.active = active;
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn endpoints_for_event_type(
        &self,
        event_type_id: Uuid,
    ) -> Result<Vec<Endpoint>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Endpoint> = inner
            .subscriptions
            .values()
            .filter(|s| s.event_type_id == event_type_id && s.active)
            .filter_map(|s| inner.endpoints.get(&s.endpoint_id))
            .filter(|ep| ep.active)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn insert_filter(&self, input: CreateFilter) -> Result<EndpointFilter, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.endpoints.contains_key(&input.endpoint_id) {
            return Err(StoreError::MissingReference { entity: "endpoint" });
        }
        let filter = EndpointFilter {
            id: Uuid::new_v4(),
            endpoint_id: input.endpoint_id,
            field_path: input.field_path,
            operator: input.operator,
            value: input.value,
            include_on_match: input.include_on_match,
            active: true,
            created_at: Utc::now(),
        };
        inner.filters.insert(filter.id, filter.clone());
        Ok(filter)
    }

    async fn list_filters(&self, endpoint_id: Uuid) -> Result<Vec<EndpointFilter>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<EndpointFilter> = inner
            .filters
            .values()
            .filter(|f| f.endpoint_id == endpoint_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(out)
    }

    async fn delete_filter(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.inner.write().await.filters.remove(&id).is_some())
    }

    async fn insert_event(&self, input: CreateEvent) -> Result<Event, StoreError> {
        let mut inner = self.inner.write().await;
        let event = Event {
            id: Uuid::new_v4(),
            event_id: input.event_id,
            event_type_id: input.event_type_id,
            event_type: input.event_type,
            payload: input.payload,
            occurred_at: input.occurred_at,
            processed: false,
            processed_at: None,
            triggered_by: input.triggered_by,
            customer_id: input.customer_id,
            source_ip: input.source_ip,
            user_agent: input.user_agent,
            created_at: Utc::now(),
        };
        inner.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.inner.read().await.events.get(&id).cloned())
    }

    async fn search_events(&self, query: EventQuery) -> Result<Vec<Event>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Event> = inner
            .events
            .values()
            .filter(|e| query.event_type_id.is_none_or(|id| e.event_type_id == id))
            .filter(|e| query.processed.is_none_or(|p| e.processed == p))
            .filter(|e| query.occurred_from.is_none_or(|t| e.occurred_at >= t))
            .filter(|e| query.occurred_to.is_none_or(|t| e.occurred_at <= t))
            .filter(|e| {
                query
                    .triggered_by
                    .is_none_or(|u| e.triggered_by == Some(u))
            })
            .filter(|e| query.customer_id.is_none_or(|c| e.customer_id == Some(c)))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        let start = usize::try_from(query.offset).unwrap_or(0).min(out.len());
        let end = (start + usize::try_from(query.limit).unwrap_or(0)).min(out.len());
        Ok(out[start..end].to_vec())
    }

    async fn mark_event_processed(&self, id: Uuid) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(event) = inner.events.get_mut(&id) {
            event.processed = true;
            event.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_delivery(
        &self,
        input: CreateDelivery,
    ) -> Result<Option<Delivery>, StoreError> {
        let mut inner = self.inner.write().await;
        let exists = inner
            .deliveries
            .values()
            .any(|d| d.event_id == input.event_id && d.endpoint_id == input.endpoint_id);
        if exists {
            return Ok(None);
        }
        let now = Utc::now();
        let delivery = Delivery {
            id: Uuid::new_v4(),
            event_id: input.event_id,
            endpoint_id: input.endpoint_id,
            status: DeliveryStatus::Pending,
            attempt_count: 0,
            max_attempts: input.max_attempts,
            scheduled_at: input.scheduled_at,
            next_retry_at: None,
            claimed_at: None,
            delivered_at: None,
            last_response_code: None,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        inner.deliveries.insert(delivery.id, delivery.clone());
        Ok(Some(delivery))
    }

    async fn find_delivery(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        Ok(self.inner.read().await.deliveries.get(&id).cloned())
    }

    async fn search_deliveries(&self, query: DeliveryQuery) -> Result<Vec<Delivery>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Delivery> = inner
            .deliveries
            .values()
            .filter(|d| query.endpoint_id.is_none_or(|id| d.endpoint_id == id))
            .filter(|d| query.event_id.is_none_or(|id| d.event_id == id))
            .filter(|d| query.status.is_none_or(|s| d.status == s))
            .filter(|d| query.min_attempts.is_none_or(|n| d.attempt_count >= n))
            .filter(|d| query.max_attempts.is_none_or(|n| d.attempt_count <= n))
            .filter(|d| query.created_from.is_none_or(|t| d.created_at >= t))
            .filter(|d| query.created_to.is_none_or(|t| d.created_at <= t))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let start = usize::try_from(query.offset).unwrap_or(0).min(out.len());
        let end = (start + usize::try_from(query.limit).unwrap_or(0)).min(out.len());
        Ok(out[start..end].to_vec())
    }

    async fn claim_due_deliveries(
        &self,
        batch: i64,
        lease: Duration,
    ) -> Result<Vec<Delivery>, StoreError> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let lease_cutoff = now - lease;

        let mut due: Vec<Uuid> = inner
            .deliveries
            .values()
            .filter(|d| {
                matches!(d.status, DeliveryStatus::Pending | DeliveryStatus::Retrying)
                    && d.attempt_count < d.max_attempts
                    && d.next_retry_at.map_or(d.scheduled_at <= now, |t| t <= now)
                    && d.claimed_at.is_none_or(|c| c < lease_cutoff)
            })
            .map(|d| d.id)
            .collect();
        due.sort_by_key(|id| inner.deliveries[id].scheduled_at);
        due.truncate(usize::try_from(batch).unwrap_or(0));

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(d) = inner.deliveries.get_mut(&id) {
                d.claimed_at = Some(now);
                d.updated_at = now;
                claimed.push(d.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_delivery_delivered(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: i16,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(d) = inner.deliveries.get_mut(&id) {
            let now = Utc::now();
            d.status = DeliveryStatus::Delivered;
            d.attempt_count = attempt_count;
            d.delivered_at = Some(now);
            d.next_retry_at = None;
            d.claimed_at = None;
            d.last_response_code = Some(response_code);
            d.last_error = None;
            d.updated_at = now;
        }
        Ok(())
    }

    async fn mark_delivery_retrying(
        &self,
        id: Uuid,
        attempt_count: i32,
        next_retry_at: DateTime<Utc>,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(d) = inner.deliveries.get_mut(&id) {
            d.status = DeliveryStatus::Retrying;
            d.attempt_count = attempt_count;
            d.next_retry_at = Some(next_retry_at);
            d.claimed_at = None;
            d.last_response_code = response_code;
            d.last_error = Some(error.to_string());
            d.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn mark_delivery_failed(
        &self,
        id: Uuid,
        attempt_count: i32,
        response_code: Option<i16>,
        error: &str,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(d) = inner.deliveries.get_mut(&id) {
            d.status = DeliveryStatus::Failed;
            d.attempt_count = attempt_count;
            d.next_retry_at = None;
            d.claimed_at = None;
            d.last_response_code = response_code;
            d.last_error = Some(error.to_string());
            d.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn insert_attempt(
        &self,
        input: CreateDeliveryAttempt,
    ) -> Result<DeliveryAttempt, StoreError> {
        let mut inner = self.inner.write().await;
        let attempt = DeliveryAttempt {
            id: Uuid::new_v4(),
            delivery_id: input.delivery_id,
            attempt_number: input.attempt_number,
            request_url: input.request_url,
            request_headers: input.request_headers,
            request_body_sha256: input.request_body_sha256,
            response_code: input.response_code,
            response_headers: input.response_headers,
            response_body: input.response_body,
            latency_ms: input.latency_ms,
            is_successful: input.is_successful,
            error_type: input.error_type,
            error_message: input.error_message,
            created_at: Utc::now(),
        };
        inner.attempts.push(attempt.clone());
        Ok(attempt)
    }

    async fn list_attempts(
        &self,
        delivery_id: Uuid,
    ) -> Result<Vec<DeliveryAttempt>, StoreError> {
        let inner = self.inner.read().await;
        let mut out: Vec<DeliveryAttempt> = inner
            .attempts
            .iter()
            .filter(|a| a.delivery_id == delivery_id)
            .cloned()
            .collect();
        out.sort_by_key(|a| a.attempt_number);
        Ok(out)
    }

    async fn record_endpoint_delivery(
        &self,
        endpoint_id: Uuid,
        success: bool,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if let Some(ep) = inner.endpoints.get_mut(&endpoint_id) {
            let now = Utc::now();
            ep.total_deliveries += 1;
            ep.last_delivery_at = Some(now);
            if success {
                ep.successful_deliveries += 1;
                ep.last_success_at = Some(now);
            } else {
                ep.failed_deliveries += 1;
                ep.last_failure_at = Some(now);
            }
            ep.updated_at = now;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_event_type() -> CreateEventType {
        CreateEventType {
            name: "invoice.paid".to_string(),
            category: "billing".to_string(),
            payload_schema: json!({"required": ["invoice_id"]}),
            sample_payload: None,
        }
    }

    async fn seed_delivery(store: &MemoryStore) -> Delivery {
        let et = store.insert_event_type(sample_event_type()).await.unwrap();
        let ep = store
            .insert_endpoint(
                CreateEndpoint {
                    name: "billing-hook".to_string(),
                    url: "https://hooks.example.com/billing".to_string(),
                    ..CreateEndpoint::default()
                },
                vec![et.id],
            )
            .await
            .unwrap();
        let event = store
            .insert_event(CreateEvent {
                event_id: crate::models::new_event_id(),
                event_type_id: et.id,
                event_type: et.name.clone(),
                payload: json!({"invoice_id": 1}),
                occurred_at: Utc::now(),
                triggered_by: None,
                customer_id: None,
                source_ip: None,
                user_agent: None,
            })
            .await
            .unwrap();
        store
            .insert_delivery(CreateDelivery {
                event_id: event.id,
                endpoint_id: ep.id,
                max_attempts: 3,
                scheduled_at: Utc::now(),
            })
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_event_type_name_rejected() {
        let store = MemoryStore::new();
        store.insert_event_type(sample_event_type()).await.unwrap();
        let err = store
            .insert_event_type(sample_event_type())
            .await
            .unwrap_err();
        assert!(err.is_duplicate());
    }

    #[tokio::test]
    async fn delivery_dedupe_on_event_endpoint_pair() {
        let store = MemoryStore::new();
        let delivery = seed_delivery(&store).await;
        let dup = store
            .insert_delivery(CreateDelivery {
                event_id: delivery.event_id,
                endpoint_id: delivery.endpoint_id,
                max_attempts: 3,
                scheduled_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(dup.is_none());
    }

    #[tokio::test]
    async fn claim_is_exclusive_until_lease_expires() {
        let store = MemoryStore::new();
        let delivery = seed_delivery(&store).await;

        let first = store
            .claim_due_deliveries(10, Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, delivery.id);

        // Second claim within the lease window sees nothing.
        let second = store
            .claim_due_deliveries(10, Duration::seconds(60))
            .await
            .unwrap();
        assert!(second.is_empty());

        // A zero lease treats the row as released.
        let third = store
            .claim_due_deliveries(10, Duration::seconds(0))
            .await
            .unwrap();
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn claim_skips_future_retries_and_exhausted_rows() {
        let store = MemoryStore::new();
        let delivery = seed_delivery(&store).await;

        store
            .mark_delivery_retrying(
                delivery.id,
                1,
                Utc::now() + Duration::seconds(300),
                Some(500),
                "HTTP 500",
            )
            .await
            .unwrap();
        let claimed = store
            .claim_due_deliveries(10, Duration::seconds(60))
            .await
            .unwrap();
        assert!(claimed.is_empty(), "future next_retry_at must not be due");

        store
            .mark_delivery_failed(delivery.id, 3, Some(500), "HTTP 500")
            .await
            .unwrap();
        let claimed = store
            .claim_due_deliveries(10, Duration::seconds(0))
            .await
            .unwrap();
        assert!(claimed.is_empty(), "terminal rows must never be claimed");
    }

    #[tokio::test]
    async fn endpoints_for_event_type_respects_both_flags() {
        let store = MemoryStore::new();
        let et = store.insert_event_type(sample_event_type()).await.unwrap();
        let ep = store
            .insert_endpoint(
                CreateEndpoint {
                    name: "hook".to_string(),
                    url: "https://hooks.example.com/x".to_string(),
                    ..CreateEndpoint::default()
                },
                vec![et.id],
            )
            .await
            .unwrap();

        assert_eq!(store.endpoints_for_event_type(et.id).await.unwrap().len(), 1);

        store
            .set_subscription_active(ep.id, et.id, false)
            .await
            .unwrap();
        assert!(store.endpoints_for_event_type(et.id).await.unwrap().is_empty());

        store
            .set_subscription_active(ep.id, et.id, true)
            .await
            .unwrap();
        store
            .update_endpoint(
                ep.id,
                UpdateEndpoint {
                    active: Some(false),
                    ..UpdateEndpoint::default()
                },
            )
            .await
            .unwrap();
        assert!(store.endpoints_for_event_type(et.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn endpoint_name_filter_applies_before_paging() {
        let store = MemoryStore::new();
        let et = store.insert_event_type(sample_event_type()).await.unwrap();
        for name in ["billing-primary", "billing-backup", "audit-log"] {
            store
                .insert_endpoint(
                    CreateEndpoint {
                        name: name.to_string(),
                        url: format!("https://hooks.example.com/{name}"),
                        ..CreateEndpoint::default()
                    },
                    vec![et.id],
                )
                .await
                .unwrap();
        }

        let query = EndpointQuery {
            name_contains: Some("Billing".to_string()),
            limit: 1,
            offset: 0,
            ..EndpointQuery::default()
        };
        let page = store.list_endpoints(query.clone()).await.unwrap();
        assert_eq!(page.len(), 1);
        assert!(page[0].name.contains("billing"));

        // Total ignores paging; the second match is on the next page.
        assert_eq!(store.count_endpoints(query.clone()).await.unwrap(), 2);
        let second = store
            .list_endpoints(EndpointQuery {
                offset: 1,
                ..query
            })
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert!(second[0].name.contains("billing"));
    }

    #[tokio::test]
    async fn update_endpoint_is_partial() {
        let store = MemoryStore::new();
        let et = store.insert_event_type(sample_event_type()).await.unwrap();
        let ep = store
            .insert_endpoint(
                CreateEndpoint {
                    name: "hook".to_string(),
                    url: "https://hooks.example.com/x".to_string(),
                    max_attempts: 5,
                    ..CreateEndpoint::default()
                },
                vec![et.id],
            )
            .await
            .unwrap();

        let updated = store
            .update_endpoint(
                ep.id,
                UpdateEndpoint {
                    max_attempts: Some(7),
                    ..UpdateEndpoint::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.max_attempts, 7);
        assert_eq!(updated.url, ep.url);
        assert_eq!(updated.name, ep.name);
    }

    #[tokio::test]
    async fn counters_track_success_and_failure() {
        let store = MemoryStore::new();
        let delivery = seed_delivery(&store).await;

        store
            .record_endpoint_delivery(delivery.endpoint_id, true)
            .await
            .unwrap();
        store
            .record_endpoint_delivery(delivery.endpoint_id, false)
            .await
            .unwrap();

        let ep = store.find_endpoint(delivery.endpoint_id).await.unwrap().unwrap();
        assert_eq!(ep.total_deliveries, 2);
        assert_eq!(ep.successful_deliveries, 1);
        assert_eq!(ep.failed_deliveries, 1);
        assert!(ep.last_delivery_at.is_some());
        assert!(ep.last_success_at.is_some());
        assert!(ep.last_failure_at.is_some());
    }
}
