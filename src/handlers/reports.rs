use super::common::success_response;
use crate::{auth::AuthenticatedUser, errors::ServiceError, handlers::AppState, ApiResponse};
use axum::{extract::State, routing::get, Router};

pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory-summary", get(inventory_summary))
        .route("/purchase-orders", get(purchase_order_breakdown))
}

/// Headline inventory numbers
#[utoipa::path(
    get,
    path = "/api/v1/reports/inventory-summary",
    responses(
        (status = 200, description = "Inventory summary", body = crate::ApiResponse<crate::services::reports::InventorySummary>)
    ),
    tag = "reports"
)]
pub async fn inventory_summary(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let summary = state.services.reports.inventory_summary().await?;
    Ok(success_response(ApiResponse::success(summary)))
}

/// Order counts and ordered value per status
#[utoipa::path(
    get,
    path = "/api/v1/reports/purchase-orders",
    responses(
        (status = 200, description = "Status breakdown", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "reports"
)]
pub async fn purchase_order_breakdown(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let lines = state.services.reports.purchase_order_breakdown().await?;
    Ok(success_response(ApiResponse::success(lines)))
}
