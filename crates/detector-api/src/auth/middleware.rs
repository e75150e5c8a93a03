use crate::auth::jwt::JwtService;
use crate::auth::models::UserContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use detector_core::AppError;
use detector_db::UserRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: JwtService,
    pub user_repository: UserRepository,
}

/// Require `Authorization: Bearer <jwt>` and attach the caller's [`UserContext`].
///
/// The token's subject must still be a registered user; tokens outlive deleted accounts.
pub async fn auth_middleware(
    State(auth_state): State<Arc<AuthState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    if !auth_header.starts_with("Bearer ") {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    }

    let token = &auth_header[7..]; // Remove "Bearer " prefix

    let claims = match auth_state.jwt.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => return HttpAppError(e).into_response(),
    };

    match auth_state.user_repository.find_by_id(claims.sub).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            tracing::debug!(user_id = %claims.sub, "Token subject no longer exists");
            return HttpAppError(AppError::Unauthorized("User no longer exists".to_string()))
                .into_response();
        }
        Err(e) => return HttpAppError(e).into_response(),
    }

    tracing::debug!(user_id = %claims.sub, "Request authenticated");

    request
        .extensions_mut()
        .insert(UserContext { user_id: claims.sub });
    next.run(request).await
}
