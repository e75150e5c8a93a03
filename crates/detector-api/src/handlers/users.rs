//! User management endpoints. Every route here sits behind the auth middleware.

use crate::auth::models::{UserContext, UserRequest};
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::services::users::USER_NOT_FOUND_MESSAGE;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use detector_core::models::UserResponse;
use detector_core::AppError;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

fn parse_user_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))
}

/// List every registered user
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    _caller: UserContext,
) -> Result<Json<Vec<UserResponse>>, HttpAppError> {
    let users = state.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Create a user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = UserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(caller = %caller.user_id, operation = "create_user"))]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    caller: UserContext,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    request.validate().map_err(AppError::from)?;

    let user = state
        .users
        .create(&request.username, &request.email, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Fetch one user
#[utoipa::path(
    get,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _caller: UserContext,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, HttpAppError> {
    let user = state.users.get(parse_user_id(&user_id)?).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Replace a user's username, email and password
#[utoipa::path(
    post,
    path = "/users/{user_id}",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    request_body = UserRequest,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state, request), fields(caller = %caller.user_id, operation = "update_user"))]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: UserContext,
    Path(user_id): Path<String>,
    ValidatedJson(request): ValidatedJson<UserRequest>,
) -> Result<Json<UserResponse>, HttpAppError> {
    let user_id = parse_user_id(&user_id)?;
    request.validate().map_err(AppError::from)?;

    let user = state
        .users
        .update(user_id, &request.username, &request.email, &request.password)
        .await?;

    Ok(Json(UserResponse::from(user)))
}

/// Delete a user with all of their images
#[utoipa::path(
    post,
    path = "/users/{user_id}/delete",
    tag = "users",
    params(
        ("user_id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 204, description = "User deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(state), fields(caller = %caller.user_id, operation = "delete_user"))]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    caller: UserContext,
    Path(user_id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.users.delete(parse_user_id(&user_id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
