//! Event type registry service.
//!
//! Maintains the catalog of event types producers may fire. Names are
//! unique; deactivating a type rejects new events of that type without
//! touching in-flight deliveries.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use hookline_db::models::{CreateEventType, EventType};
use hookline_db::store::{EventTypeQuery, WebhookStore};

use crate::error::WebhookError;
use crate::models::{EventTypeResponse, ListEventTypesQuery, RegisterEventTypeRequest};

/// Service for event type registry operations.
#[derive(Clone)]
pub struct EventTypeService {
    store: Arc<dyn WebhookStore>,
}

impl EventTypeService {
    #[must_use]
    pub fn new(store: Arc<dyn WebhookStore>) -> Self {
        Self { store }
    }

    /// Register a new event type.
    pub async fn register(
        &self,
        request: RegisterEventTypeRequest,
    ) -> Result<EventTypeResponse, WebhookError> {
        validate_event_type_name(&request.name)?;

        let input = CreateEventType {
            name: request.name,
            category: request.category,
            payload_schema: request.payload_schema,
            sample_payload: request.sample_payload,
        };

        let created = self.store.insert_event_type(input).await.map_err(|e| {
            if e.is_duplicate() {
                WebhookError::Duplicate("event type name".to_string())
            } else {
                WebhookError::Store(e)
            }
        })?;

        tracing::info!(
            target: "webhook_registry",
            event_type_id = %created.id,
            name = %created.name,
            category = %created.category,
            "Registered event type"
        );

        Ok(created.into())
    }

    /// Look up an event type by its dotted name.
    pub async fn get_by_name(&self, name: &str) -> Result<EventTypeResponse, WebhookError> {
        let event_type = self
            .store
            .find_event_type_by_name(name)
            .await?
            .ok_or(WebhookError::EventTypeNotFound)?;
        Ok(event_type.into())
    }

    /// List event types, optionally filtered by category and active flag.
    pub async fn list(
        &self,
        query: ListEventTypesQuery,
    ) -> Result<Vec<EventTypeResponse>, WebhookError> {
        let types = self
            .store
            .list_event_types(EventTypeQuery {
                category: query.category,
                active: query.active,
            })
            .await?;
        Ok(types.into_iter().map(Into::into).collect())
    }

    /// Activate or deactivate an event type.
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<(), WebhookError> {
        let updated = self.store.set_event_type_active(id, active).await?;
        if !updated {
            return Err(WebhookError::EventTypeNotFound);
        }
        tracing::info!(
            target: "webhook_registry",
            event_type_id = %id,
            active,
            "Event type active flag changed"
        );
        Ok(())
    }
}

/// Check a payload against an event type's required fields.
///
/// Only top-level presence is enforced; field types and nested shapes
/// are not checked.
pub fn validate_payload(event_type: &EventType, payload: &Value) -> Result<(), WebhookError> {
    let missing: Vec<&str> = event_type
        .required_fields()
        .into_iter()
        .filter(|field| {
            payload
                .as_object()
                .is_none_or(|map| !map.contains_key(*field))
        })
        .collect();

    if !missing.is_empty() {
        return Err(WebhookError::Validation(format!(
            "Payload missing required fields: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}

/// Event type names are lowercase dotted identifiers, e.g. `invoice.paid`.
fn validate_event_type_name(name: &str) -> Result<(), WebhookError> {
    let valid = !name.is_empty()
        && name.len() <= 255
        && !name.starts_with('.')
        && !name.ends_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_');
    if !valid {
        return Err(WebhookError::Validation(format!(
            "Invalid event type name: {name}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn event_type(schema: Value) -> EventType {
        EventType {
            id: Uuid::new_v4(),
            name: "invoice.paid".to_string(),
            category: "billing".to_string(),
            payload_schema: schema,
            sample_payload: None,
            active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn payload_with_required_fields_passes() {
        let et = event_type(json!({"required": ["invoice_id", "amount"]}));
        let payload = json!({"invoice_id": "inv_1", "amount": 100, "extra": true});
        assert!(validate_payload(&et, &payload).is_ok());
    }

    #[test]
    fn payload_missing_required_field_is_rejected() {
        let et = event_type(json!({"required": ["invoice_id", "amount"]}));
        let err = validate_payload(&et, &json!({"invoice_id": "inv_1"})).unwrap_err();
        assert!(matches!(err, WebhookError::Validation(msg) if msg.contains("amount")));
    }

    #[test]
    fn non_object_payload_fails_when_fields_required() {
        let et = event_type(json!({"required": ["invoice_id"]}));
        assert!(validate_payload(&et, &json!("not an object")).is_err());
        assert!(validate_payload(&event_type(json!({})), &json!("anything")).is_ok());
    }

    #[test]
    fn event_type_names_are_dotted_lowercase() {
        assert!(validate_event_type_name("invoice.paid").is_ok());
        assert!(validate_event_type_name("customer.subscription_renewed").is_ok());
        assert!(validate_event_type_name("Invoice.Paid").is_err());
        assert!(validate_event_type_name(".invoice").is_err());
        assert!(validate_event_type_name("invoice..paid").is_err());
        assert!(validate_event_type_name("").is_err());
    }
}
