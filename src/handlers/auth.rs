use super::common::{success_response, validate_input};
use crate::{errors::ServiceError, handlers::AppState, ApiResponse};
use axum::{
    extract::{Json, State},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct SetPasswordRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct RequestResetRequest {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 8))]
    pub password: String,
}

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/set-password", post(set_password))
        .route("/request-reset", post(request_reset))
        .route("/reset-password", post(reset_password))
}

/// Exchange email + password for a session token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = crate::ApiResponse<serde_json::Value>),
        (status = 401, description = "Invalid credentials", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let session = state.auth.login(&payload.email, &payload.password).await?;
    Ok(success_response(ApiResponse::success(session)))
}

/// First-login flow for accounts provisioned without a password
#[utoipa::path(
    post,
    path = "/api/v1/auth/set-password",
    request_body = SetPasswordRequest,
    responses(
        (status = 200, description = "Password set, session issued", body = crate::ApiResponse<serde_json::Value>),
        (status = 409, description = "Password already set", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn set_password(
    State(state): State<AppState>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let session = state
        .auth
        .set_initial_password(&payload.email, &payload.password)
        .await?;
    Ok(success_response(ApiResponse::success(session)))
}

/// Start a password reset. The token would normally be e-mailed; this
/// admin tool returns it directly.
#[utoipa::path(
    post,
    path = "/api/v1/auth/request-reset",
    request_body = RequestResetRequest,
    responses(
        (status = 200, description = "Reset token issued", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "auth"
)]
pub async fn request_reset(
    State(state): State<AppState>,
    Json(payload): Json<RequestResetRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    let token = state.auth.request_password_reset(&payload.email).await?;
    Ok(success_response(ApiResponse::success(json!({
        "reset_token": token,
    }))))
}

/// Complete a password reset with a previously issued token
#[utoipa::path(
    post,
    path = "/api/v1/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = crate::ApiResponse<serde_json::Value>),
        (status = 401, description = "Invalid or expired token", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<impl axum::response::IntoResponse, ServiceError> {
    validate_input(&payload)?;
    state
        .auth
        .reset_password(&payload.token, &payload.password)
        .await?;
    Ok(success_response(ApiResponse::<serde_json::Value>::success(
        json!({ "message": "Password updated. You can now log in." }),
    )))
}
