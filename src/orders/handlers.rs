// HTTP handlers for order endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::orders::{
    CheckoutRequest, OrderError, OrderResponse, OrderStatus, UpdatePaymentRequest,
    UpdateStatusRequest,
};

/// Query parameters for order history
#[derive(Debug, Deserialize)]
pub struct OrderHistoryQuery {
    /// Optional status filter
    pub status: Option<OrderStatus>,
}

/// Handler for POST /api/orders
/// Checks out the submitted cart for the authenticated user
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state.order_service.checkout(user.user_id, request).await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    let response = OrderResponse::from_parts(order, items);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler for GET /api/orders
/// Retrieves order history for the authenticated user
pub async fn get_order_history_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Query(query): Query<OrderHistoryQuery>,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .get_user_orders(user.user_id, query.status)
        .await?;

    Ok(Json(orders))
}

/// Handler for GET /api/orders/{order_id}
/// Retrieves a specific order by ID
pub async fn get_order_by_id_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    // Ownership check happens in the service layer
    let order = state
        .order_service
        .get_order_by_id(order_id, user.user_id)
        .await?;

    Ok(Json(order))
}

/// Handler for PATCH /api/admin/orders/{order_id}/status
/// Updates the status of an order (admin only; role enforced by router middleware)
pub async fn update_order_status_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_order_status(order_id, request.status)
        .await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for PATCH /api/admin/orders/{order_id}/payment
/// Updates the payment status of an order (admin only)
pub async fn update_payment_status_handler(
    State(state): State<crate::AppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    request
        .validate()
        .map_err(|e| OrderError::ValidationError(e.to_string()))?;

    let order = state
        .order_service
        .update_payment_status(order_id, request.payment_status)
        .await?;

    let items = state.order_items_repo.find_by_order_id(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}
