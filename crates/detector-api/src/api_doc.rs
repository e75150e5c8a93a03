//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::models;
use crate::error;
use crate::handlers;
use detector_core::models::{ImageResponse, ImageStatus, UserResponse};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Detector API",
        version = "0.1.0",
        description = "Upload images, run object detection on them and browse the resulting tags."
    ),
    paths(
        handlers::images::list_images,
        handlers::images::search_images,
        handlers::images::serve_image,
        handlers::upload::upload_form,
        handlers::upload::upload_image,
        handlers::detect::detect_image,
        handlers::detect::delete_image,
        handlers::auth::signup,
        handlers::auth::login,
        handlers::users::list_users,
        handlers::users::create_user,
        handlers::users::get_user,
        handlers::users::update_user,
        handlers::users::delete_user,
    ),
    components(
        schemas(
            ImageResponse,
            ImageStatus,
            UserResponse,
            handlers::upload::UploadFormResponse,
            models::SignupRequest,
            models::UserRequest,
            models::LoginRequest,
            models::SignupResponse,
            models::TokenResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "images", description = "Upload, detection, listing and deletion of images"),
        (name = "auth", description = "Account creation and bearer tokens"),
        (name = "users", description = "Listing, editing and removal of accounts")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
