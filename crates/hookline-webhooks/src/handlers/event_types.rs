//! Event type registry handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use crate::error::{ApiResult, WebhookError};
use crate::models::{
    EventTypeListResponse, EventTypeResponse, ListEventTypesQuery, RegisterEventTypeRequest,
    SetEventTypeActiveRequest,
};
use crate::router::WebhooksState;

/// Register a new event type.
#[utoipa::path(
    post,
    path = "/webhooks/event-types",
    tag = "Webhooks",
    request_body = RegisterEventTypeRequest,
    responses(
        (status = 201, description = "Event type registered", body = EventTypeResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Event type name already exists"),
    )
)]
pub async fn register_event_type_handler(
    State(state): State<WebhooksState>,
    Json(request): Json<RegisterEventTypeRequest>,
) -> ApiResult<(StatusCode, Json<EventTypeResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.event_type_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List event types.
#[utoipa::path(
    get,
    path = "/webhooks/event-types",
    tag = "Webhooks",
    params(ListEventTypesQuery),
    responses(
        (status = 200, description = "Event type list", body = EventTypeListResponse),
    )
)]
pub async fn list_event_types_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<ListEventTypesQuery>,
) -> ApiResult<Json<EventTypeListResponse>> {
    let event_types = state.event_type_service.list(query).await?;
    let total = event_types.len();
    Ok(Json(EventTypeListResponse { event_types, total }))
}

/// Get a single event type by name.
#[utoipa::path(
    get,
    path = "/webhooks/event-types/{name}",
    tag = "Webhooks",
    params(
        ("name" = String, Path, description = "Dotted event type name")
    ),
    responses(
        (status = 200, description = "Event type details", body = EventTypeResponse),
        (status = 404, description = "Event type not found"),
    )
)]
pub async fn get_event_type_handler(
    State(state): State<WebhooksState>,
    Path(name): Path<String>,
) -> ApiResult<Json<EventTypeResponse>> {
    let response = state.event_type_service.get_by_name(&name).await?;
    Ok(Json(response))
}

/// Activate or deactivate an event type.
///
/// Deactivation makes `trigger_event` reject the type; registered
/// endpoints and their subscriptions are untouched.
#[utoipa::path(
    patch,
    path = "/webhooks/event-types/{name}",
    tag = "Webhooks",
    params(
        ("name" = String, Path, description = "Dotted event type name")
    ),
    request_body = SetEventTypeActiveRequest,
    responses(
        (status = 200, description = "Event type updated", body = EventTypeResponse),
        (status = 404, description = "Event type not found"),
    )
)]
pub async fn set_event_type_active_handler(
    State(state): State<WebhooksState>,
    Path(name): Path<String>,
    Json(request): Json<SetEventTypeActiveRequest>,
) -> ApiResult<Json<EventTypeResponse>> {
    let event_type = state.event_type_service.get_by_name(&name).await?;
    state
        .event_type_service
        .set_active(event_type.id, request.active)
        .await?;
    let response = state.event_type_service.get_by_name(&name).await?;
    Ok(Json(response))
}
