//! Delivery history query handlers.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::models::{
    DeliveryAttemptListResponse, DeliveryListResponse, DeliveryResponse, SearchDeliveriesQuery,
};
use crate::router::WebhooksState;

/// Search deliveries.
#[utoipa::path(
    get,
    path = "/webhooks/deliveries",
    tag = "Webhooks",
    params(SearchDeliveriesQuery),
    responses(
        (status = 200, description = "Delivery list", body = DeliveryListResponse),
    )
)]
pub async fn search_deliveries_handler(
    State(state): State<WebhooksState>,
    Query(query): Query<SearchDeliveriesQuery>,
) -> ApiResult<Json<DeliveryListResponse>> {
    let deliveries = state.delivery_service.search_deliveries(query).await?;
    let total = deliveries.len();
    Ok(Json(DeliveryListResponse { deliveries, total }))
}

/// Get a single delivery.
#[utoipa::path(
    get,
    path = "/webhooks/deliveries/{id}",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Delivery details", body = DeliveryResponse),
        (status = 404, description = "Delivery not found"),
    )
)]
pub async fn get_delivery_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeliveryResponse>> {
    let response = state.delivery_service.get_delivery(id).await?;
    Ok(Json(response))
}

/// List the attempt history of a delivery.
#[utoipa::path(
    get,
    path = "/webhooks/deliveries/{id}/attempts",
    tag = "Webhooks",
    params(
        ("id" = Uuid, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Attempt list", body = DeliveryAttemptListResponse),
        (status = 404, description = "Delivery not found"),
    )
)]
pub async fn list_attempts_handler(
    State(state): State<WebhooksState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeliveryAttemptListResponse>> {
    let attempts = state.delivery_service.list_attempts(id).await?;
    Ok(Json(DeliveryAttemptListResponse { attempts }))
}
