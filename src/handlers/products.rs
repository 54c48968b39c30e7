use super::common::{
    created_response, default_page, default_per_page, no_content_response, success_response,
    validate_input, PaginatedResponse,
};
use crate::{
    auth::AuthenticatedUser,
    errors::ServiceError,
    handlers::AppState,
    services::products::{NewProduct, ProductFilter, ProductSort, ProductUpdate, StockLevelFilter},
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
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    #[validate(range(min = 0))]
    pub quantity: i32,
    #[validate(range(min = 0))]
    pub reorder_level: i32,
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub reorder_level: Option<i32>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListProductsQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    /// "low" or "out"
    pub stock_level: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
}

pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/low-stock", get(low_stock))
        .route(
            "/:product_id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// List the product catalog with search and stock-level filters
#[utoipa::path(
    get,
    path = "/api/v1/products",
    responses(
        (status = 200, description = "Product page", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let stock_level = match query.stock_level.as_deref() {
        None => None,
        Some("low") => Some(StockLevelFilter::Low),
        Some("out") => Some(StockLevelFilter::Out),
        Some(other) => {
            return Err(ServiceError::ValidationError(format!(
                "Unknown stock_level '{}', expected low or out",
                other
            )))
        }
    };

    let sort = match query.sort_by.as_deref() {
        Some("ProductId") => Some(ProductSort::ProductId),
        Some("Category") => Some(ProductSort::Category),
        Some("Quantity") => Some(ProductSort::Quantity),
        Some("Price") => Some(ProductSort::Price),
        _ => Some(ProductSort::Name),
    };

    let filter = ProductFilter {
        search: query.search,
        category: query.category,
        stock_level,
        sort,
        descending: query.sort_dir.as_deref() == Some("desc"),
    };

    let (rows, total) = state
        .services
        .products
        .list(filter, query.page, query.per_page)
        .await?;

    Ok(success_response(PaginatedResponse::new(
        rows,
        query.page,
        query.per_page,
        total,
    )))
}

/// Products at or below their reorder level
#[utoipa::path(
    get,
    path = "/api/v1/products/low-stock",
    responses(
        (status = 200, description = "Low stock products", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "products"
)]
pub async fn low_stock(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let rows = state.services.products.low_stock().await?;
    Ok(success_response(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{product_id}",
    params(("product_id" = String, Path, description = "Business id, e.g. P0001")),
    responses(
        (status = 200, description = "Product detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    let product = state.services.products.get(&product_id).await?;
    Ok(success_response(ApiResponse::success(product)))
}

/// Create a product, allocating the next P#### id
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let created = state
        .services
        .products
        .create(NewProduct {
            name: payload.name,
            category: payload.category,
            quantity: payload.quantity,
            reorder_level: payload.reorder_level,
            price: payload.price,
        })
        .await?;

    Ok(created_response(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/products/{product_id}",
    params(("product_id" = String, Path, description = "Business id, e.g. P0001")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<String>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;

    let updated = state
        .services
        .products
        .update(
            &product_id,
            ProductUpdate {
                name: payload.name,
                category: payload.category,
                reorder_level: payload.reorder_level,
                price: payload.price,
                quantity: payload.quantity,
            },
        )
        .await?;

    Ok(success_response(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/products/{product_id}",
    params(("product_id" = String, Path, description = "Business id, e.g. P0001")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(product_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    state.services.products.delete(&product_id).await?;
    Ok(no_content_response())
}
