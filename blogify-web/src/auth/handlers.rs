//! Registration, login and current-user handlers

use super::{
    users::{AuthResponse, LoginRequest, RegisterRequest, UserInfo},
    Identity,
};
use crate::{error::ApiResult, AppState};
use axum::{extract::State, http::StatusCode, response::Json};
use blogify_applications::AccessError;
use tracing::info;

/// Register a new account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email or username already taken")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    info!("User registration attempt: {}", request.username);
    let response = state.users.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Log in with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = state.users.login(request).await?;
    info!(user_id = %response.user.id, "User logged in");
    Ok(Json(response))
}

/// Current user
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user", body = UserInfo),
        (status = 401, description = "Missing or invalid credential"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn me(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> ApiResult<Json<UserInfo>> {
    let user = state
        .users
        .get(identity.subject_id())
        .await?
        .ok_or(AccessError::IdentityNotFound)?;
    Ok(Json(user.to_user_info()))
}
