use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stocktrack API",
        version = "0.3.0",
        description = r#"
# Stocktrack Inventory & Procurement API

Backend for a small-business inventory and procurement tracker: product
catalog, suppliers and their offered prices, purchase orders with a
status lifecycle, the append-only stock-transaction ledger, and member
accounts.

## Authentication

All mutating endpoints require a session token issued by
`POST /api/v1/auth/login`:

```
Authorization: Bearer <token>
```

Accounts are provisioned without a password; the first login goes through
`POST /api/v1/auth/set-password`.

## Identifiers

Every record carries a human-readable sequential id (`P0001`, `S0001`,
`PR0001`, `T0001`, `U001`) alongside its storage key. API paths use the
human-readable id.
"#,
        contact(name = "Stocktrack", email = "support@stocktrack.dev")
    ),
    paths(
        crate::handlers::auth::login,
        crate::handlers::auth::set_password,
        crate::handlers::auth::request_reset,
        crate::handlers::auth::reset_password,
        crate::handlers::products::list_products,
        crate::handlers::products::low_stock,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,
        crate::handlers::suppliers::list_supplier_products,
        crate::handlers::suppliers::add_supplier_product,
        crate::handlers::suppliers::remove_supplier_product,
        crate::handlers::purchase_orders::create_purchase_orders,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::change_status,
        crate::handlers::stock::list_transactions,
        crate::handlers::stock::get_transaction,
        crate::handlers::stock::post_adjustment,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::create_user,
        crate::handlers::users::update_user,
        crate::handlers::users::delete_user,
        crate::handlers::reports::inventory_summary,
        crate::handlers::reports::purchase_order_breakdown,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::SetPasswordRequest,
        crate::handlers::auth::RequestResetRequest,
        crate::handlers::auth::ResetPasswordRequest,
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::suppliers::CreateSupplierRequest,
        crate::handlers::suppliers::UpdateSupplierRequest,
        crate::handlers::suppliers::AddSupplierProductRequest,
        crate::handlers::purchase_orders::CreatePurchaseOrdersRequest,
        crate::handlers::purchase_orders::OrderLineDto,
        crate::handlers::purchase_orders::ChangeStatusRequest,
        crate::handlers::stock::ManualAdjustmentRequest,
        crate::handlers::stock::AdjustmentLineDto,
        crate::handlers::users::CreateUserRequest,
        crate::handlers::users::UpdateUserRequest,
        crate::services::reports::InventorySummary,
        crate::services::reports::PurchaseOrderStatusLine,
    )),
    tags(
        (name = "auth", description = "Session management"),
        (name = "products", description = "Product catalog"),
        (name = "suppliers", description = "Suppliers and offered prices"),
        (name = "purchase-orders", description = "Procurement workflow"),
        (name = "stock", description = "Stock-transaction ledger"),
        (name = "users", description = "Member management"),
        (name = "reports", description = "Read-only projections"),
    )
)]
pub struct ApiDoc;

/// Swagger UI router mounted next to the API.
pub fn swagger_routes() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
