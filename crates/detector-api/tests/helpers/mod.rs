//! Test helpers: build the application around a stub detector.
//!
//! Each `TestApp` owns a temporary directory holding its SQLite file and
//! upload folder, so tests never share state.

#![allow(dead_code)]

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use detector_api::setup;
use detector_core::{Config, DetectorConfig};
use detector_processing::{
    BoundingBox, Detection, DetectionError, LabelSet, ObjectDetector,
};
use image::DynamicImage;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_JWT_SECRET: &str = "test-secret-key-min-32-characters-long-for-testing";

/// Detector that returns the same detections for every image.
pub struct StubDetector {
    labels: LabelSet,
    detections: Vec<Detection>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            labels: LabelSet::coco(),
            detections,
        }
    }
}

impl ObjectDetector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> Result<Vec<Detection>, DetectionError> {
        Ok(self.detections.clone())
    }

    fn labels(&self) -> &LabelSet {
        &self.labels
    }
}

/// Detection with a box inside every fixture image
pub fn detection(label: &str, score: f32) -> Detection {
    Detection::new(label, BoundingBox::new(4.0, 20.0, 40.0, 44.0), score)
}

/// Test application: server, pool, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub pool: SqlitePool,
    pub upload_dir: PathBuf,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Names of every file currently in the upload folder, sorted.
    pub fn stored_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.upload_dir)
            .expect("Failed to read upload dir")
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub async fn image_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_images")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count images")
    }

    pub async fn tag_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM user_image_tags")
            .fetch_one(&self.pool)
            .await
            .expect("Failed to count tags")
    }
}

/// Test app whose detector always finds one cat with score 0.9.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(vec![detection("cat", 0.9)]).await
}

pub async fn setup_test_app_with(detections: Vec<Detection>) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(temp_dir.path());
    let upload_dir = config.upload_folder().to_path_buf();

    let (state, app) = setup::build_app(config, Arc::new(StubDetector::new(detections)))
        .await
        .expect("Failed to build app");

    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        pool: state.db.pool.clone(),
        upload_dir,
        _temp_dir: temp_dir,
    }
}

fn create_test_config(dir: &Path) -> Config {
    Config(Box::new(DetectorConfig {
        environment: "test".to_string(),
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        http_concurrency_limit: 64,
        database_url: format!("sqlite://{}", dir.join("test.db").display()),
        // A single connection keeps SQLite writers from contending
        db_max_connections: 1,
        db_timeout_seconds: 5,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiry_hours: 1,
        upload_folder: dir.join("uploads"),
        max_file_size_bytes: 1024 * 1024,
        allowed_extensions: vec!["png".to_string(), "jpg".to_string(), "jpeg".to_string()],
        model_path: dir.join("unused.onnx"),
        labels_path: None,
    }))
}
