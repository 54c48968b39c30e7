use super::common::{
    created_response, default_page, default_per_page, no_content_response, success_response,
    validate_input, PaginatedResponse,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::AppState,
    services::suppliers::{NewSupplier, SupplierUpdate},
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub company: String,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 200))]
    pub contact_person: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 50))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct AddSupplierProductRequest {
    #[validate(length(min = 1))]
    pub product_id: String,
    pub supplier_price: Decimal,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListSuppliersQuery {
    pub search: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

pub fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_suppliers).post(create_supplier))
        .route(
            "/:supplier_id",
            get(get_supplier).put(update_supplier).delete(delete_supplier),
        )
        .route(
            "/:supplier_id/products",
            get(list_supplier_products).post(add_supplier_product),
        )
        .route(
            "/:supplier_id/products/:product_id",
            axum::routing::delete(remove_supplier_product),
        )
}

/// List suppliers; search matches company or contact person
#[utoipa::path(
    get,
    path = "/api/v1/suppliers",
    responses(
        (status = 200, description = "Supplier page", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "suppliers"
)]
pub async fn list_suppliers(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListSuppliersQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let (rows, total) = state
        .services
        .suppliers
        .list(query.search.as_deref(), query.page, query.per_page)
        .await?;
    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page,
        query.per_page,
        total,
    )))
}

#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Business id, e.g. S0001")),
    responses(
        (status = 200, description = "Supplier detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown supplier", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn get_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(supplier_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let supplier = state.services.suppliers.get(&supplier_id).await?;
    Ok(success_response(ApiResponse::success(supplier)))
}

/// Create a supplier, allocating the next S#### id
#[utoipa::path(
    post,
    path = "/api/v1/suppliers",
    request_body = CreateSupplierRequest,
    responses(
        (status = 201, description = "Supplier created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn create_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = state
        .services
        .suppliers
        .create(NewSupplier {
            company: payload.company,
            contact_person: payload.contact_person,
            email: payload.email,
            phone: payload.phone,
            address: payload.address,
        })
        .await?;

    Ok(created_response(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Business id, e.g. S0001")),
    request_body = UpdateSupplierRequest,
    responses(
        (status = 200, description = "Supplier updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown supplier", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn update_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(supplier_id): Path<String>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .suppliers
        .update(
            &supplier_id,
            SupplierUpdate {
                company: payload.company,
                contact_person: payload.contact_person,
                email: payload.email,
                phone: payload.phone,
                address: payload.address,
            },
        )
        .await?;

    Ok(success_response(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{supplier_id}",
    params(("supplier_id" = String, Path, description = "Business id, e.g. S0001")),
    responses(
        (status = 204, description = "Supplier deleted"),
        (status = 404, description = "Unknown supplier", body = crate::errors::ErrorResponse)
    ),
    tag = "suppliers"
)]
pub async fn delete_supplier(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(supplier_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state.services.suppliers.delete(&supplier_id).await?;
    Ok(no_content_response())
}

/// The supplier's offered product prices
#[utoipa::path(
    get,
    path = "/api/v1/suppliers/{supplier_id}/products",
    params(("supplier_id" = String, Path, description = "Business id, e.g. S0001")),
    responses(
        (status = 200, description = "Offered prices", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "suppliers"
)]
pub async fn list_supplier_products(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(supplier_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let rows = state.services.suppliers.list_products(&supplier_id).await?;
    Ok(success_response(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/suppliers/{supplier_id}/products",
    params(("supplier_id" = String, Path, description = "Business id, e.g. S0001")),
    request_body = AddSupplierProductRequest,
    responses(
        (status = 201, description = "Price link created", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "suppliers"
)]
pub async fn add_supplier_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(supplier_id): Path<String>,
    Json(payload): Json<AddSupplierProductRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let created = state
        .services
        .suppliers
        .add_product(&supplier_id, &payload.product_id, payload.supplier_price)
        .await?;
    Ok(created_response(ApiResponse::success(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/suppliers/{supplier_id}/products/{product_id}",
    params(
        ("supplier_id" = String, Path, description = "Business id, e.g. S0001"),
        ("product_id" = String, Path, description = "Business id, e.g. P0001")
    ),
    responses((status = 204, description = "Price link removed")),
    tag = "suppliers"
)]
pub async fn remove_supplier_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path((supplier_id, product_id)): Path<(String, String)>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state
        .services
        .suppliers
        .remove_product(&supplier_id, &product_id)
        .await?;
    Ok(no_content_response())
}
