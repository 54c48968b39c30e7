use super::common::{created_response, no_content_response, success_response, validate_input};
use crate::{
    auth::AuthenticatedUser,
    entities::user::UserRole,
    errors::ServiceError,
    handlers::AppState,
    ApiResponse,
};
use axum::{
    extract::{Json, Path, Query, State},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    /// Admin, Staff, Manager or Supplier
    #[validate(length(min = 1))]
    pub role: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListUsersQuery {
    pub role: Option<String>,
    pub search: Option<String>,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route(
            "/:user_id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

/// Member management is restricted to administrators.
fn require_admin(user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Member management requires the Admin role".to_string(),
        ))
    }
}

fn parse_role(value: &str) -> Result<UserRole, ServiceError> {
    value
        .parse()
        .map_err(|_| ServiceError::ValidationError(format!("Unknown role '{}'", value)))
}

/// List members with role and email-search filters
#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, description = "Members", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<ListUsersQuery>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    require_admin(&user)?;

    let role = query.role.as_deref().map(parse_role).transpose()?;
    let rows = state
        .services
        .users
        .list(role, query.search.as_deref())
        .await?;
    Ok(success_response(ApiResponse::success(rows)))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "Business id, e.g. U001")),
    responses(
        (status = 200, description = "Member detail", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Unknown member", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    require_admin(&user)?;
    let found = state.services.users.get(&user_id).await?;
    Ok(success_response(ApiResponse::success(found)))
}

/// Provision a member without credentials; they set a password on first
/// login
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Member created", body = crate::ApiResponse<serde_json::Value>),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    require_admin(&user)?;
    validate_input(&payload)?;
    let role = parse_role(&payload.role)?;

    let created = state.services.users.create(&payload.email, role).await?;
    Ok(created_response(ApiResponse::success(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "Business id, e.g. U001")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Member updated", body = crate::ApiResponse<serde_json::Value>),
        (status = 409, description = "Email already in use", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    require_admin(&user)?;
    validate_input(&payload)?;
    let role = payload.role.as_deref().map(parse_role).transpose()?;

    let updated = state
        .services
        .users
        .update(&user_id, payload.email.as_deref(), role)
        .await?;
    Ok(success_response(ApiResponse::success(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{user_id}",
    params(("user_id" = String, Path, description = "Business id, e.g. U001")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Unknown member", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    require_admin(&user)?;
    state.services.users.delete(&user_id).await?;
    Ok(no_content_response())
}
