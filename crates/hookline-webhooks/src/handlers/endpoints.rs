//! CRUD handlers for webhook endpoints and their filters.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiResult, WebhookError};
use crate::models::{
    CreateEndpointRequest, CreateFilterRequest, EndpointListResponse, EndpointResponse,
    FilterResponse, ListEndpointsQuery, TestEndpointRequest, TestEndpointResult,
    UpdateEndpointRequest,
};
use crate::router::WebhooksState;

// ---------------------------------------------------------------------------
// Endpoint CRUD handlers
// ---------------------------------------------------------------------------

/// Create a new webhook endpoint.
#[utoipa::path(
    post,
    path = "/webhooks/endpoints",
    tag = "Webhooks",
    request_body = CreateEndpointRequest,
    responses(
        (status = 201, description = "Endpoint created", body = EndpointResponse),
        (status = 400, description = "Validation error"),
    )
)]
pub async fn create_endpoint_handler(
    State(state): State<WebhooksState>,
    Json(request): Json<CreateEndpointRequest>,
) -> ApiResult<(StatusCode, Json<EndpointResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.endpoint_service.create_endpoint(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List webhook endpoints.
#[utoipa::path(
    get,
    path = "/webhooks/endpoints",
    tag = "Webhooks",
    params(ListEndpointsQuery),
    responses(
        (status = 200, description = "Paginated endpoint list", body = EndpointListResponse),
    )
)]
pub async fn list_endpoints_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<ListEndpointsQuery>,
) -> ApiResult<Json<EndpointListResponse>> {
    let response = state.endpoint_service.list_endpoints(query).await?;
    Ok(Json(response))
}

/// Get a single webhook endpoint.
#[utoipa::path(
    get,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 200, description = "Endpoint details", body = EndpointResponse),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn get_endpoint_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EndpointResponse>> {
    let response = state.endpoint_service.get_endpoint(id).await?;
    Ok(Json(response))
}

/// Update a webhook endpoint.
#[utoipa::path(
    patch,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    request_body = UpdateEndpointRequest,
    responses(
        (status = 200, description = "Endpoint updated", body = EndpointResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn update_endpoint_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateEndpointRequest>,
) -> ApiResult<Json<EndpointResponse>> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.endpoint_service.update_endpoint(id, request).await?;
    Ok(Json(response))
}

/// Delete a webhook endpoint.
#[utoipa::path(
    delete,
    path = "/webhooks/endpoints/{id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 204, description = "Endpoint deleted"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn delete_endpoint_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.endpoint_service.delete_endpoint(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Filter handlers
// ---------------------------------------------------------------------------

/// Add a payload filter to an endpoint.
#[utoipa::path(
    post,
    path = "/webhooks/endpoints/{id}/filters",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    request_body = CreateFilterRequest,
    responses(
        (status = 201, description = "Filter created", body = FilterResponse),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn create_filter_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CreateFilterRequest>,
) -> ApiResult<(StatusCode, Json<FilterResponse>)> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.endpoint_service.create_filter(id, request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List an endpoint's payload filters.
#[utoipa::path(
    get,
    path = "/webhooks/endpoints/{id}/filters",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    responses(
        (status = 200, description = "Filter list", body = [FilterResponse]),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn list_filters_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<FilterResponse>>> {
    let response = state.endpoint_service.list_filters(id).await?;
    Ok(Json(response))
}

/// Remove a payload filter from an endpoint.
#[utoipa::path(
    delete,
    path = "/webhooks/endpoints/{id}/filters/{filter_id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID"),
        ("filter_id" = Uuid, Path, description = "Filter ID"),
    ),
    responses(
        (status = 204, description = "Filter deleted"),
        (status = 404, description = "Endpoint or filter not found"),
    )
)]
pub async fn delete_filter_handler(
    State(state): State<WebhooksState>,
    Path((id, filter_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    state.endpoint_service.delete_filter(id, filter_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Test runner handler
// ---------------------------------------------------------------------------

/// Send a one-off test delivery to an endpoint.
#[utoipa::path(
    post,
    path = "/webhooks/endpoints/{id}/test",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Endpoint ID")
    ),
    request_body = TestEndpointRequest,
    responses(
        (status = 200, description = "Test attempt result", body = TestEndpointResult),
        (status = 400, description = "Validation error"),
        (status = 404, description = "Endpoint not found"),
    )
)]
pub async fn test_endpoint_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
    Json(request): Json<TestEndpointRequest>,
) -> ApiResult<Json<TestEndpointResult>> {
    request
        .validate()
        .map_err(|e| WebhookError::Validation(e.to_string()))?;

    let response = state.delivery_service.test_endpoint(id, request).await?;
    Ok(Json(response))
}
