use super::common::{
    created_response, default_page, default_per_page, success_response, validate_input,
    PaginatedResponse,
};
use crate::{
    auth::AuthenticatedUser,
    entities::purchase_order::PurchaseOrderStatus,
    errors::ServiceError,
    handlers::AppState,
    services::purchase_orders::{
        OrderLineRequest, PurchaseOrderDateField, PurchaseOrderFilter, PurchaseOrderSort,
    },
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

// Request and response DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrdersRequest {
    #[validate(length(min = 1, message = "at least one line item is required"))]
    pub items: Vec<OrderLineDto>,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct OrderLineDto {
    #[validate(length(min = 1))]
    pub product_id: String,
    #[validate(length(min = 1))]
    pub supplier_id: String,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ChangeStatusRequest {
    /// Target status: Pending, Approved, Completed, Cancelled or Rejected
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(max = 500))]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListPurchaseOrdersQuery {
    pub status: Option<String>,
    pub supplier_id: Option<String>,
    /// "created" or "lastupdate"
    pub date_type: Option<String>,
    /// Inclusive lower bound, YYYY-MM-DD
    pub date_from: Option<String>,
    /// Inclusive upper bound, YYYY-MM-DD (extends to end of day)
    pub date_to: Option<String>,
    pub sort: Option<String>,
    #[serde(default)]
    pub desc: bool,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_purchase_orders).post(create_purchase_orders))
        .route("/:po_id", get(get_purchase_order))
        .route("/:po_id/status", put(change_status))
}

/// Create purchase orders from a batch of line items, one order per
/// supplier represented in the batch
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrdersRequest,
    responses(
        (status = 201, description = "Purchase orders created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_orders(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreatePurchaseOrdersRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let lines = payload
        .items
        .into_iter()
        .map(|item| OrderLineRequest {
            product_id: item.product_id,
            supplier_id: item.supplier_id,
            quantity: item.quantity,
            unit_price: item.unit_price,
        })
        .collect();

    let created = state
        .services
        .purchase_orders
        .create_purchase_orders(lines, payload.remarks, &user.user_id)
        .await?;

    Ok(created_response(ApiResponse::success(json!({
        "created_count": created.created_count,
        "po_ids": created.po_ids,
        "message": created.message,
    }))))
}

/// List purchase orders with browse filters
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses(
        (status = 200, description = "Purchase orders page", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListPurchaseOrdersQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let status = query
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;

    let date_field = match query.date_type.as_deref() {
        None | Some("none") => None,
        Some(s) if s.eq_ignore_ascii_case("created") => Some(PurchaseOrderDateField::Created),
        Some(s) if s.eq_ignore_ascii_case("lastupdate") => Some(PurchaseOrderDateField::LastUpdated),
        Some(other) => {
            return Err(ServiceError::ValidationError(format!(
                "Unknown date_type '{}'",
                other
            )))
        }
    };

    let date_from = query
        .date_from
        .as_deref()
        .map(|d| parse_date(d, false))
        .transpose()?;
    // The upper bound includes the whole day
    let date_to = query
        .date_to
        .as_deref()
        .map(|d| parse_date(d, true))
        .transpose()?;

    let sort = match query.sort.as_deref() {
        None | Some("poId") => Some(PurchaseOrderSort::PoId),
        Some("supplierId") => Some(PurchaseOrderSort::SupplierId),
        Some("status") => Some(PurchaseOrderSort::Status),
        Some("created") => Some(PurchaseOrderSort::Created),
        Some("lastUpdate") => Some(PurchaseOrderSort::LastUpdated),
        Some(_) => Some(PurchaseOrderSort::PoId),
    };

    let filter = PurchaseOrderFilter {
        status,
        supplier_id: query.supplier_id,
        date_field,
        date_from,
        date_to,
        sort,
        descending: query.desc,
    };

    let (rows, total) = state
        .services
        .purchase_orders
        .list_orders(filter, query.page, query.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page,
        query.per_page,
        total,
    )))
}

/// A purchase order header with its line items
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{po_id}",
    params(("po_id" = String, Path, description = "Business id, e.g. PR0001")),
    responses(
        (status = 200, description = "Purchase order detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown purchase order", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(po_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let order = state.services.purchase_orders.get_order(&po_id).await?;
    let items = state
        .services
        .purchase_orders
        .get_order_items(&po_id)
        .await?;

    Ok(success_response(ApiResponse::success(json!({
        "order": order,
        "items": items,
    }))))
}

/// Change a purchase order's status. Completion posts the stock receipt;
/// cancelling or rejecting requires remarks. On a validation failure the
/// response carries the order's current persisted state for correction.
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{po_id}/status",
    params(("po_id" = String, Path, description = "Business id, e.g. PR0001")),
    request_body = ChangeStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn change_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(po_id): Path<String>,
    Json(payload): Json<ChangeStatusRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let new_status = parse_status(&payload.status)?;

    match state
        .services
        .purchase_orders
        .change_status(&po_id, new_status, payload.remarks, &user.user_id)
        .await
    {
        Ok(outcome) => Ok(success_response(ApiResponse::success(json!({
            "po_id": outcome.po_id,
            "old_status": outcome.old_status.as_str(),
            "new_status": outcome.new_status.as_str(),
            "message": outcome.message,
            "skipped_products": outcome.skipped_products,
        })))),
        // Re-show the stored order alongside the field error so the caller
        // corrects against persisted state, not their discarded input.
        Err(ServiceError::ValidationError(msg)) => {
            let order = state.services.purchase_orders.get_order(&po_id).await?;
            let items = state
                .services
                .purchase_orders
                .get_order_items(&po_id)
                .await?;
            let mut response = ApiResponse::<serde_json::Value>::error(msg);
            response.data = Some(json!({ "order": order, "items": items }));
            Ok((StatusCode::BAD_REQUEST, axum::Json(response)).into_response())
        }
        Err(other) => Err(other),
    }
}

fn parse_status(value: &str) -> Result<PurchaseOrderStatus, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::ValidationError(format!("Unknown status '{}'", value)))
}

fn parse_date(value: &str, end_of_day: bool) -> Result<DateTime<Utc>, ServiceError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| ServiceError::ValidationError(format!("Invalid date '{}': {}", value, e)))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    }
    .ok_or_else(|| ServiceError::ValidationError(format!("Invalid date '{}'", value)))?;
    Ok(DateTime::<Utc>::from_naive_utc_and_offset(time, Utc))
}
