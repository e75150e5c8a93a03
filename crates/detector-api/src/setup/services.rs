//! Service and repository wiring

use crate::auth::jwt::JwtService;
use crate::services::{DetectionService, UserService};
use crate::state::{AppState, AuthConfig, DbState, ImageState};
use anyhow::{Context, Result};
use detector_core::Config;
use detector_db::{SqliteImageRepository, UserRepository};
use detector_processing::{AnnotationRenderer, ObjectDetector, UploadValidator};
use detector_storage::{LocalStorage, Storage};
use sqlx::SqlitePool;
use std::sync::Arc;

pub async fn initialize_services(
    config: &Config,
    pool: SqlitePool,
    detector: Arc<dyn ObjectDetector>,
) -> Result<Arc<AppState>> {
    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(config.upload_folder())
            .await
            .context("Failed to initialize upload folder")?,
    );
    tracing::info!(upload_folder = %config.upload_folder().display(), "Local storage ready");

    let renderer = AnnotationRenderer::new(detector.labels().len())
        .context("Failed to initialize annotation renderer")?;

    let validator = UploadValidator::new(
        config.max_file_size_bytes(),
        config.allowed_extensions().to_vec(),
    );

    let detection = DetectionService::new(
        Arc::new(SqliteImageRepository::new(pool.clone())),
        storage.clone(),
        detector,
        Arc::new(renderer),
        validator,
    );

    let users = UserService::new(UserRepository::new(pool.clone()), storage.clone());

    Ok(Arc::new(AppState {
        db: DbState {
            user_repository: UserRepository::new(pool.clone()),
            pool,
        },
        images: ImageState { detection, storage },
        users,
        auth: AuthConfig {
            jwt: JwtService::new(config.jwt_secret(), config.jwt_expiry_hours()),
        },
    }))
}
