use crate::auth::models::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::ImageState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use detector_core::error::IMAGE_NOT_FOUND_MESSAGE;
use detector_core::models::ImageResponse;
use detector_core::AppError;
use uuid::Uuid;

/// An id that does not parse cannot name an image either
fn parse_image_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(IMAGE_NOT_FOUND_MESSAGE.to_string()))
}

/// Run object detection on a stored image
///
/// Replaces the image with an annotated copy and tags it with every label
/// scoring above 0.5. Succeeds once per image.
#[utoipa::path(
    post,
    path = "/detect/{image_id}",
    tag = "images",
    params(
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Detection committed", body = ImageResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Target image does not exist", body = ErrorResponse),
        (status = 409, description = "Image has already been processed", body = ErrorResponse),
        (status = 500, description = "Detection failed", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(images), fields(user_id = %user.user_id, operation = "detect_image"))]
pub async fn detect_image(
    State(images): State<ImageState>,
    user: UserContext,
    Path(image_id): Path<String>,
) -> Result<Json<ImageResponse>, HttpAppError> {
    let image_id = parse_image_id(&image_id)?;

    let outcome = images.detection.detect(&user, image_id).await?;

    Ok(Json(ImageResponse::new(
        outcome.image,
        None,
        outcome.labels,
    )))
}

/// Delete an image owned by the caller
#[utoipa::path(
    post,
    path = "/images/delete/{image_id}",
    tag = "images",
    params(
        ("image_id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 204, description = "Image deleted"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Not the owner", body = ErrorResponse),
        (status = 404, description = "Target image does not exist", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(images), fields(user_id = %user.user_id, operation = "delete_image"))]
pub async fn delete_image(
    State(images): State<ImageState>,
    user: UserContext,
    Path(image_id): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    let image_id = parse_image_id(&image_id)?;

    images.detection.delete(&user, image_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_image_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_image_id(&id.to_string()).unwrap(), id);

        match parse_image_id("42") {
            Err(AppError::NotFound(msg)) => assert_eq!(msg, "Target image does not exist"),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }
}
