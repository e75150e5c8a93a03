//! Upload / detect / delete workflow.
//!
//! Handlers stay thin: they extract the caller and the request payload and hand
//! both to [`DetectionService`]. Every step that can leave a file without a
//! record (or the reverse) is compensated here.

use crate::auth::models::UserContext;
use super::remove_stored_file;
use crate::error::{detection_error, render_error, storage_error, validation_error};
use detector_core::error::IMAGE_NOT_FOUND_MESSAGE;
use detector_core::models::{ImageWithTags, StoredImage};
use detector_core::AppError;
use detector_db::ImageRepository;
use detector_processing::{encode_jpeg, AnnotationRenderer, ObjectDetector, UploadValidator};
use detector_storage::{Storage, RENDERED_EXTENSION};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Outcome of a successful detection
#[derive(Debug, Clone)]
pub struct DetectionOutcome {
    pub image: StoredImage,
    /// Labels committed as tags, in acceptance order
    pub labels: Vec<String>,
}

#[derive(Clone)]
pub struct DetectionService {
    repository: Arc<dyn ImageRepository>,
    storage: Arc<dyn Storage>,
    detector: Arc<dyn ObjectDetector>,
    renderer: Arc<AnnotationRenderer>,
    validator: UploadValidator,
}

impl DetectionService {
    pub fn new(
        repository: Arc<dyn ImageRepository>,
        storage: Arc<dyn Storage>,
        detector: Arc<dyn ObjectDetector>,
        renderer: Arc<AnnotationRenderer>,
        validator: UploadValidator,
    ) -> Self {
        Self {
            repository,
            storage,
            detector,
            renderer,
            validator,
        }
    }

    pub fn validator(&self) -> &UploadValidator {
        &self.validator
    }

    /// Validate and store an uploaded file, then record it as `Uploaded`.
    ///
    /// Nothing is written when validation fails. If the record cannot be
    /// created the stored file is removed again.
    #[tracing::instrument(skip(self, data), fields(user_id = %user.user_id, filename = %filename, size_bytes = data.len()))]
    pub async fn upload(
        &self,
        user: &UserContext,
        filename: &str,
        data: Vec<u8>,
    ) -> Result<StoredImage, AppError> {
        let extension = self
            .validator
            .validate_all(filename, &data)
            .map_err(validation_error)?;

        let name = self
            .storage
            .save(data, &extension)
            .await
            .map_err(storage_error)?;

        match self.repository.create(user.user_id, &name).await {
            Ok(image) => {
                tracing::info!(image_id = %image.id, image_path = %image.image_path, "Image uploaded");
                Ok(image)
            }
            Err(e) => {
                self.remove_file(&name).await;
                Err(e)
            }
        }
    }

    /// Run detection on a stored image and commit the annotated copy and its tags.
    ///
    /// Unknown ids are `NotFound` and change nothing. Commit failures roll back,
    /// remove the rendered file and surface as `DetectionFailed`.
    #[tracing::instrument(skip(self), fields(user_id = %user.user_id, image_id = %image_id))]
    pub async fn detect(
        &self,
        user: &UserContext,
        image_id: Uuid,
    ) -> Result<DetectionOutcome, AppError> {
        let start = Instant::now();

        let image = self
            .repository
            .find_by_id(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND_MESSAGE.to_string()))?;

        if image.is_detected {
            return Err(AppError::Conflict(
                "Image has already been processed".to_string(),
            ));
        }

        // The record exists, so a missing file is a broken store, not an unknown image
        let data = self.storage.load(&image.image_path).await.map_err(|e| {
            tracing::error!(
                error = %e,
                image_id = %image_id,
                image_path = %image.image_path,
                "Stored file for image could not be loaded"
            );
            AppError::Storage(e.to_string())
        })?;

        let detector = self.detector.clone();
        let renderer = self.renderer.clone();
        let (rendered, labels) = tokio::task::spawn_blocking(move || {
            let decoded = image::load_from_memory(&data)
                .map_err(|e| AppError::ImageProcessing(format!("Failed to decode image: {}", e)))?;
            let detections = detector.detect(&decoded).map_err(detection_error)?;
            let (annotated, labels) = renderer.render(&decoded, &detections);
            let encoded = encode_jpeg(&annotated).map_err(render_error)?;
            Ok::<_, AppError>((encoded, labels))
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to spawn blocking task");
            AppError::Internal(e.to_string())
        })??;

        let rendered_name = self
            .storage
            .save(rendered, RENDERED_EXTENSION)
            .await
            .map_err(storage_error)?;

        let committed = match self
            .repository
            .commit_detection_result(image_id, &rendered_name, &labels)
            .await
        {
            Ok(image) => image,
            Err(e) => {
                self.remove_file(&rendered_name).await;
                return Err(match e {
                    AppError::NotFound(_) | AppError::Conflict(_) => e,
                    other => {
                        tracing::error!(
                            error = %other,
                            image_id = %image_id,
                            "Failed to commit detection result"
                        );
                        AppError::DetectionFailed(other.to_string())
                    }
                });
            }
        };

        tracing::info!(
            image_id = %image_id,
            image_path = %committed.image_path,
            labels = ?labels,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Detection committed"
        );

        Ok(DetectionOutcome {
            image: committed,
            labels,
        })
    }

    /// Delete an image owned by `user`, its tags and every backing file.
    #[tracing::instrument(skip(self), fields(user_id = %user.user_id, image_id = %image_id))]
    pub async fn delete(&self, user: &UserContext, image_id: Uuid) -> Result<(), AppError> {
        let image = self
            .repository
            .find_by_id(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND_MESSAGE.to_string()))?;

        if image.user_id != user.user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own images".to_string(),
            ));
        }

        let deleted = self
            .repository
            .delete_by_id(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(IMAGE_NOT_FOUND_MESSAGE.to_string()))?;

        for name in deleted.file_names() {
            self.remove_file(name).await;
        }

        tracing::info!(image_id = %image_id, "Image deleted");
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<ImageWithTags>, AppError> {
        self.repository.list_with_tags().await
    }

    pub async fn search(&self, query: &str) -> Result<Vec<ImageWithTags>, AppError> {
        self.repository.search_by_tag(query.trim()).await
    }

    async fn remove_file(&self, name: &str) {
        remove_stored_file(self.storage.as_ref(), name).await;
    }
}
