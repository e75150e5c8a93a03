use crate::auth::models::UserContext;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::ImageState;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use detector_core::models::ImageResponse;
use detector_core::AppError;
use detector_processing::validator::MISSING_FILE_MESSAGE;
use serde::Serialize;
use utoipa::ToSchema;

/// Multipart field the upload endpoint reads the file from
pub const UPLOAD_FIELD: &str = "image";

/// What the upload endpoint accepts
#[derive(Debug, Serialize, ToSchema)]
pub struct UploadFormResponse {
    #[schema(example = "image")]
    pub field: String,
    pub allowed_extensions: Vec<String>,
    pub max_file_size: usize,
}

#[utoipa::path(
    get,
    path = "/upload",
    tag = "images",
    responses(
        (status = 200, description = "Upload form description", body = UploadFormResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_form(
    State(images): State<ImageState>,
    _user: UserContext,
) -> Json<UploadFormResponse> {
    let validator = images.detection.validator();
    Json(UploadFormResponse {
        field: UPLOAD_FIELD.to_string(),
        allowed_extensions: validator.allowed_extensions().to_vec(),
        max_file_size: validator.max_file_size(),
    })
}

/// Read the single `image` field. A missing field is reported like an empty one.
async fn extract_image_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if file.is_some() {
            return Err(AppError::BadRequest(format!(
                "Multiple file fields are not allowed; send exactly one field named '{}'",
                UPLOAD_FIELD
            )));
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?;

        file = Some((filename, data.to_vec()));
    }

    file.ok_or_else(|| AppError::BadRequest(MISSING_FILE_MESSAGE.to_string()))
}

/// Upload an image
///
/// The file is validated (size, extension, decodability), stored under a
/// generated name and recorded as `uploaded` for the caller.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image uploaded", body = ImageResponse),
        (status = 400, description = "Missing file or unsupported format", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
#[tracing::instrument(skip(images, multipart), fields(user_id = %user.user_id, operation = "upload_image"))]
pub async fn upload_image(
    State(images): State<ImageState>,
    user: UserContext,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let (filename, data) = extract_image_field(multipart).await?;

    let image = images.detection.upload(&user, &filename, data).await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse::new(image, None, Vec::new())),
    ))
}
