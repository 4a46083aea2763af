// HTTP handlers for return request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::middleware::AuthenticatedUser;
use crate::returns::{
    error::ReturnError,
    models::{CreateReturnRequest, ResolveReturnRequest, ReturnResponse, ReturnStatus},
};

/// Query parameters for the admin return list
#[derive(Debug, Deserialize)]
pub struct ReturnListQuery {
    pub status: Option<ReturnStatus>,
}

/// Handler for POST /api/returns
/// Opens a return for one of the caller's delivered orders
pub async fn create_return_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReturnRequest>,
) -> Result<(StatusCode, Json<ReturnResponse>), ReturnError> {
    request
        .validate()
        .map_err(|e| ReturnError::ValidationError(e.to_string()))?;

    let created = state
        .return_service
        .request_return(user.user_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Handler for GET /api/returns
/// Lists the caller's return requests
pub async fn get_user_returns_handler(
    State(state): State<crate::AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Vec<ReturnResponse>>, ReturnError> {
    let returns = state.return_service.get_user_returns(user.user_id).await?;
    Ok(Json(returns.into_iter().map(|r| r.into()).collect()))
}

/// Handler for GET /api/admin/returns
/// Lists all return requests, optionally filtered by status
pub async fn list_returns_handler(
    State(state): State<crate::AppState>,
    Query(query): Query<ReturnListQuery>,
) -> Result<Json<Vec<ReturnResponse>>, ReturnError> {
    let returns = state.return_service.list_returns(query.status).await?;
    Ok(Json(returns.into_iter().map(|r| r.into()).collect()))
}

/// Handler for PATCH /api/admin/returns/{id}
/// Approves or rejects a pending return
pub async fn resolve_return_handler(
    State(state): State<crate::AppState>,
    Path(return_id): Path<i32>,
    Json(request): Json<ResolveReturnRequest>,
) -> Result<Json<ReturnResponse>, ReturnError> {
    request
        .validate()
        .map_err(|e| ReturnError::ValidationError(e.to_string()))?;

    let resolved = state
        .return_service
        .resolve_return(return_id, request.status)
        .await?;

    Ok(Json(resolved.into()))
}
