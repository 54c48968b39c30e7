use super::common::{created_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    entities::stock_transaction::StockTransactionType,
    errors::ServiceError,
    handlers::AppState,
    services::stock_ledger::AdjustmentLine,
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ManualAdjustmentRequest {
    /// "IN" or "OUT"
    #[validate(length(min = 1))]
    pub tx_type: String,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub items: Vec<AdjustmentLineDto>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AdjustmentLineDto {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListTransactionsQuery {
    pub transaction_id: Option<String>,
    pub user_id: Option<String>,
}

pub fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions))
        .route("/transactions/:transaction_id", get(get_transaction))
        .route("/adjustments", axum::routing::post(post_adjustment))
}

/// List stock transactions, newest first
#[utoipa::path(
    get,
    path = "/api/v1/stock/transactions",
    responses(
        (status = 200, description = "Stock transactions", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "stock"
)]
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let rows = state
        .services
        .stock
        .list_transactions(query.transaction_id.as_deref(), query.user_id.as_deref())
        .await?;
    Ok(success_response(ApiResponse::success(rows)))
}

/// A stock transaction header with its item rows
#[utoipa::path(
    get,
    path = "/api/v1/stock/transactions/{transaction_id}",
    params(("transaction_id" = String, Path, description = "Business id, e.g. T0001")),
    responses(
        (status = 200, description = "Transaction detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown transaction", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(transaction_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (header, items) = state.services.stock.get_transaction(&transaction_id).await?;
    Ok(success_response(ApiResponse::success(json!({
        "transaction": header,
        "items": items,
    }))))
}

/// Post a manual stock adjustment batch. OUT batches are rejected before
/// any write if a line would drive a product's quantity negative.
#[utoipa::path(
    post,
    path = "/api/v1/stock/adjustments",
    request_body = ManualAdjustmentRequest,
    responses(
        (status = 201, description = "Adjustment posted", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient stock", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn post_adjustment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<ManualAdjustmentRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let tx_type: StockTransactionType = payload.tx_type.parse().map_err(|_| {
        ServiceError::ValidationError(format!(
            "Unknown transaction type '{}', expected IN or OUT",
            payload.tx_type
        ))
    })?;

    let lines = payload
        .items
        .into_iter()
        .map(|item| AdjustmentLine {
            product_id: item.product_id,
            quantity: item.quantity,
            remarks: item.remarks,
        })
        .collect();

    let posting = state
        .services
        .stock
        .post_manual_adjustment(lines, tx_type, payload.reason, &user.user_id)
        .await?;

    Ok(created_response(ApiResponse::success(json!({
        "transaction_id": posting.transaction_id,
        "posted_lines": posting.posted_lines,
    }))))
}
