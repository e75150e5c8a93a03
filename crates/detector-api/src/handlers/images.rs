use crate::error::{ErrorResponse, HttpAppError};
use crate::state::ImageState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::Response,
    Json,
};
use detector_core::models::ImageResponse;
use detector_core::AppError;
use detector_storage::{extension_of, StorageError};
use futures::StreamExt;
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Substring matched case-insensitively against tag names
    #[serde(default)]
    pub q: String,
}

/// List every image, newest first, with its owner and tags
#[utoipa::path(
    get,
    path = "/",
    tag = "images",
    responses(
        (status = 200, description = "All images", body = Vec<ImageResponse>),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(images), fields(operation = "list_images"))]
pub async fn list_images(
    State(images): State<ImageState>,
) -> Result<Json<Vec<ImageResponse>>, HttpAppError> {
    let items = images.detection.list().await?;
    Ok(Json(items.into_iter().map(ImageResponse::from).collect()))
}

/// Images with at least one tag containing `q`
#[utoipa::path(
    get,
    path = "/images/search",
    tag = "images",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching images", body = Vec<ImageResponse>),
        (status = 400, description = "Empty query", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(images), fields(operation = "search_images", query = %query.q))]
pub async fn search_images(
    State(images): State<ImageState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ImageResponse>>, HttpAppError> {
    if query.q.trim().is_empty() {
        return Err(AppError::InvalidInput("Search query cannot be empty".to_string()).into());
    }

    let items = images.detection.search(&query.q).await?;
    Ok(Json(items.into_iter().map(ImageResponse::from).collect()))
}

fn content_type_for(filename: &str) -> &'static str {
    match extension_of(filename).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Serve a stored image by its generated file name
#[utoipa::path(
    get,
    path = "/images/{filename}",
    tag = "images",
    params(
        ("filename" = String, Path, description = "Generated file name")
    ),
    responses(
        (status = 200, description = "Image file", content_type = "image/jpeg"),
        (status = 404, description = "No such file", body = ErrorResponse)
    )
)]
pub async fn serve_image(
    State(images): State<ImageState>,
    Path(filename): Path<String>,
) -> Result<Response, HttpAppError> {
    let stream = images
        .storage
        .load_stream(&filename)
        .await
        .map_err(|e| match e {
            StorageError::NotFound(_) | StorageError::InvalidKey(_) => {
                AppError::NotFound("Image not found".to_string())
            }
            other => {
                tracing::error!(error = %other, filename = %filename, "Failed to open stored image");
                crate::error::storage_error(other)
            }
        })?;

    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&filename))
        // Names are never reused, so the bytes behind one never change
        .header(header::CACHE_CONTROL, "public, max-age=31536000, immutable")
        .body(Body::from_stream(body_stream))
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to build response");
            AppError::Internal(e.to_string()).into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a"), "application/octet-stream");
    }
}
