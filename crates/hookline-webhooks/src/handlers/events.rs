//! Event ingress and query handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, WebhookError};
use crate::models::{
    EventListResponse, EventResponse, SearchEventsQuery, TriggerEventRequest, TriggerEventResponse,
};
use crate::router::WebhooksState;

/// Trigger an event and dispatch it to matching endpoints.
#[utoipa::path(
    post,
    path = "/webhooks/events",
    tag = "Webhooks",
    request_body = TriggerEventRequest,
    responses(
        (status = 201, description = "Event stored and dispatched", body = TriggerEventResponse),
        (status = 400, description = "Unknown event type or invalid payload"),
    )
)]
pub async fn trigger_event_handler(
    State(state): State<WebhooksState>,
    Json(request): Json<TriggerEventRequest>,
) -> ApiResult<(StatusCode, Json<TriggerEventResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.event_service.trigger_event(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Search fired events.
#[utoipa::path(
    get,
    path = "/webhooks/events",
    tag = "Webhooks",
    params(SearchEventsQuery),
    responses(
        (status = 200, description = "Event list", body = EventListResponse),
        (status = 404, description = "Filtered event type not found"),
    )
)]
pub async fn search_events_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<SearchEventsQuery>,
) -> ApiResult<Json<EventListResponse>> {
    let events = state.event_service.search_events(query).await?;
    let total = events.len();
    Ok(Json(EventListResponse { events, total }))
}

/// Get a single event.
#[utoipa::path(
    get,
    path = "/webhooks/events/{id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event details", body = EventResponse),
        (status = 404, description = "Event not found"),
    )
)]
pub async fn get_event_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EventResponse>> {
    let response = state.event_service.get_event(id).await?;
    Ok(Json(response))
}
