//! Endpoint registry service.
//!
//! CRUD for webhook endpoints with URL validation, SSRF protection and
//! secret encryption at rest, plus per-endpoint payload filters and
//! subscription management.

use std::sync::Arc;

use uuid::Uuid;

use hookline_db::models::{
    CreateEndpoint, CreateFilter, EndpointFilter, EndpointSubscription, UpdateEndpoint,
};
use hookline_db::store::{EndpointQuery, WebhookStore};

use crate::crypto;
use crate::error::WebhookError;
use crate::models::{
    CreateEndpointRequest, CreateFilterRequest, EndpointListResponse, EndpointResponse,
    FilterResponse, ListEndpointsQuery, UpdateEndpointRequest,
};
use crate::validation::{self, UrlPolicy};

/// Service for endpoint registry operations.
#[derive(Clone)]
pub struct EndpointService {
    store: Arc<dyn WebhookStore>,
    encryption_key: Vec<u8>,
    url_policy: UrlPolicy,
}

impl EndpointService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>, encryption_key: Vec<u8>) -> Self {
        Self {
            store,
            encryption_key,
            url_policy: UrlPolicy::default(),
        }
    }

    /// Relax URL validation (for development/testing).
    #[must_use]
    pub fn with_url_policy(mut self, policy: UrlPolicy) -> Self {
        self.url_policy = policy;
        self
    }

    /// Create a new endpoint with optional event type subscriptions.
    pub async fn create_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointResponse, WebhookError> {
        validation::validate_destination_url(&request.url, self.url_policy)?;
        if let Some(ref method) = request.http_method {
            validation::validate_http_method(method)?;
        }
        validate_custom_headers(request.custom_headers.as_ref())?;

        // Every subscribed event type must exist up front, so a bad id
        // fails the whole request instead of a partial insert.
        for event_type_id in &request.event_type_ids {
            if self.store.find_event_type(*event_type_id).await?.is_none() {
                return Err(WebhookError::Validation(format!(
                    "Unknown event type id: {event_type_id}"
                )));
            }
        }

        let secret_encrypted = match &request.secret {
            Some(secret) if !secret.is_empty() => {
                Some(crypto::encrypt_secret(secret, &self.encryption_key)?)
            }
            _ => None,
        };

        let defaults = CreateEndpoint::default();
        let input = CreateEndpoint {
            name: request.name,
            description: request.description,
            url: request.url,
            http_method: request.http_method.unwrap_or(defaults.http_method),
            content_type: request.content_type.unwrap_or(defaults.content_type),
            secret_encrypted,
            signature_algorithm: request
                .signature_algorithm
                .unwrap_or(defaults.signature_algorithm),
            retry_strategy: request.retry_strategy.unwrap_or(defaults.retry_strategy),
            retry_delay_secs: request.retry_delay_secs.unwrap_or(defaults.retry_delay_secs),
            max_attempts: request.max_attempts.unwrap_or(defaults.max_attempts),
            timeout_secs: request.timeout_secs.unwrap_or(defaults.timeout_secs),
            verify_tls: request.verify_tls.unwrap_or(defaults.verify_tls),
            enable_filtering: request.enable_filtering.unwrap_or(defaults.enable_filtering),
            custom_headers: request.custom_headers.unwrap_or(defaults.custom_headers),
            created_by: request.created_by,
        };

        let endpoint = self
            .store
            .insert_endpoint(input, request.event_type_ids)
            .await?;

        tracing::info!(
            target: "webhook_registry",
            endpoint_id = %endpoint.id,
            name = %endpoint.name,
            url = %endpoint.url,
            "Created webhook endpoint"
        );

        Ok(endpoint.into())
    }

    /// Get a single endpoint.
    pub async fn get_endpoint(&self, id: Uuid) -> Result<EndpointResponse, WebhookError> {
        let endpoint = self
            .store
            .find_endpoint(id)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;
        Ok(endpoint.into())
    }

    /// List endpoints with pagination.
    pub async fn list_endpoints(
        &self,
        query: ListEndpointsQuery,
    ) -> Result<EndpointListResponse, WebhookError> {
        let limit = query.limit.clamp(1, 100);
        let offset = query.offset.max(0);

        let store_query = EndpointQuery {
            active: query.active,
            name_contains: query.name_contains,
            limit,
            offset,
        };
        let endpoints = self.store.list_endpoints(store_query.clone()).await?;
        let total = usize::try_from(self.store.count_endpoints(store_query).await?).unwrap_or(0);

        Ok(EndpointListResponse {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            total,
            limit,
            offset,
        })
    }

    /// Partially update an endpoint.
    ///
    /// In-flight deliveries keep the retry policy snapshotted at their
    /// creation; only future deliveries see the new settings.
    pub async fn update_endpoint(
        &self,
        id: Uuid,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointResponse, WebhookError> {
        if let Some(ref url) = request.url {
            validation::validate_destination_url(url, self.url_policy)?;
        }
        if let Some(ref method) = request.http_method {
            validation::validate_http_method(method)?;
        }
        validate_custom_headers(request.custom_headers.as_ref())?;

        // The store treats None as "keep existing", so an empty string
        // would be silently dropped here. Clearing a secret is
        // unsupported; say so instead.
        let secret_encrypted = match request.secret.as_deref() {
            Some("") => {
                return Err(WebhookError::Validation(
                    "Secret cannot be empty; omit the field to keep the current secret"
                        .to_string(),
                ))
            }
            Some(secret) => Some(crypto::encrypt_secret(secret, &self.encryption_key)?),
            None => None,
        };

        let update = UpdateEndpoint {
            name: request.name,
            description: request.description,
            url: request.url,
            http_method: request.http_method,
            content_type: request.content_type,
            secret_encrypted,
            signature_algorithm: request.signature_algorithm,
            retry_strategy: request.retry_strategy,
            retry_delay_secs: request.retry_delay_secs,
            max_attempts: request.max_attempts,
            timeout_secs: request.timeout_secs,
            verify_tls: request.verify_tls,
            enable_filtering: request.enable_filtering,
            custom_headers: request.custom_headers,
            active: request.active,
        };

        let endpoint = self
            .store
            .update_endpoint(id, update)
            .await?
            .ok_or(WebhookError::EndpointNotFound)?;

        Ok(endpoint.into())
    }

    /// Delete an endpoint along with its subscriptions and filters.
    ///
    /// In-flight deliveries are not touched here; the delivery engine
    /// fails them terminally when it finds the endpoint gone.
    pub async fn delete_endpoint(&self, id: Uuid) -> Result<(), WebhookError> {
        let deleted = self.store.delete_endpoint(id).await?;
        if !deleted {
            return Err(WebhookError::EndpointNotFound);
        }
        tracing::info!(
            target: "webhook_registry",
            endpoint_id = %id,
            "Deleted webhook endpoint"
        );
        Ok(())
    }

    /// List an endpoint's event type subscriptions.
    pub async fn list_subscriptions(
        &self,
        endpoint_id: Uuid,
    ) -> Result<Vec<EndpointSubscription>, WebhookError> {
        self.require_endpoint(endpoint_id).await?;
        Ok(self.store.list_subscriptions(endpoint_id).await?)
    }

    /// Pause or resume one subscription without touching the others.
    pub async fn set_subscription_active(
        &self,
        endpoint_id: Uuid,
        event_type_id: Uuid,
        active: bool,
    ) -> Result<(), WebhookError> {
        let updated = self
            .store
            .set_subscription_active(endpoint_id, event_type_id, active)
            .await?;
        if !updated {
            return Err(WebhookError::Validation(format!(
                "Endpoint {endpoint_id} has no subscription to event type {event_type_id}"
            )));
        }
        Ok(())
    }

    // --- Filters ---------------------------------------------------------

    /// Add a payload filter to an endpoint.
    pub async fn create_filter(
        &self,
        endpoint_id: Uuid,
        request: CreateFilterRequest,
    ) -> Result<FilterResponse, WebhookError> {
        self.require_endpoint(endpoint_id).await?;

        let filter = self
            .store
            .insert_filter(CreateFilter {
                endpoint_id,
                field_path: request.field_path,
                operator: request.operator,
                value: request.value,
                include_on_match: request.include_on_match,
            })
            .await?;

        Ok(filter.into())
    }

    /// List an endpoint's filters.
    pub async fn list_filters(
        &self,
        endpoint_id: Uuid,
    ) -> Result<Vec<FilterResponse>, WebhookError> {
        self.require_endpoint(endpoint_id).await?;
        let filters = self.store.list_filters(endpoint_id).await?;
        Ok(filters.into_iter().map(Into::into).collect())
    }

    /// Remove one filter from an endpoint.
    pub async fn delete_filter(
        &self,
        endpoint_id: Uuid,
        filter_id: Uuid,
    ) -> Result<(), WebhookError> {
        // The filter must belong to the endpoint in the path.
        let filters: Vec<EndpointFilter> = self.store.list_filters(endpoint_id).await?;
        if !filters.iter().any(|f| f.id == filter_id) {
            return Err(WebhookError::FilterNotFound);
        }
        let deleted = self.store.delete_filter(filter_id).await?;
        if !deleted {
            return Err(WebhookError::FilterNotFound);
        }
        Ok(())
    }

    async fn require_endpoint(&self, id: Uuid) -> Result<(), WebhookError> {
        if self.store.find_endpoint(id).await?.is_none() {
            return Err(WebhookError::EndpointNotFound);
        }
        Ok(())
    }
}

/// Custom headers must be a flat map of string values.
fn validate_custom_headers(headers: Option<&serde_json::Value>) -> Result<(), WebhookError> {
    let Some(headers) = headers else {
        return Ok(());
    };
    let Some(map) = headers.as_object() else {
        return Err(WebhookError::Validation(
            "custom_headers must be a JSON object".to_string(),
        ));
    };
    for (name, value) in map {
        if !value.is_string() {
            return Err(WebhookError::Validation(format!(
                "custom_headers.{name} must be a string"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn custom_headers_must_be_string_map() {
        assert!(validate_custom_headers(None).is_ok());
        assert!(validate_custom_headers(Some(&json!({}))).is_ok());
        assert!(validate_custom_headers(Some(&json!({"X-Team": "billing"}))).is_ok());
        assert!(validate_custom_headers(Some(&json!({"X-Count": 3}))).is_err());
        assert!(validate_custom_headers(Some(&json!(["not", "a", "map"]))).is_err());
    }
}
