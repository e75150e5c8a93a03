//! Test fixtures: small encoded images and upload helpers.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

use super::auth::TestUser;

fn encode(format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(64, 48, |x, y| Rgb([(x * 4) as u8, (y * 5) as u8, 90]));
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut out, format)
        .expect("Failed to encode fixture");
    out.into_inner()
}

/// 64x48 JPEG
pub fn create_test_jpeg() -> Vec<u8> {
    encode(ImageFormat::Jpeg)
}

/// 64x48 PNG
pub fn create_test_png() -> Vec<u8> {
    encode(ImageFormat::Png)
}

/// POST `/upload` with `data` in the `image` field under `filename`.
pub async fn upload(
    client: &TestServer,
    user: &TestUser,
    filename: &str,
    data: Vec<u8>,
) -> TestResponse {
    let part = Part::bytes(data).file_name(filename.to_string());
    client
        .post("/upload")
        .add_header("Authorization", user.bearer())
        .multipart(MultipartForm::new().add_part("image", part))
        .await
}

/// Upload a JPEG as `cat.jpg` and return the created image body.
pub async fn upload_cat(client: &TestServer, user: &TestUser) -> serde_json::Value {
    let response = upload(client, user, "cat.jpg", create_test_jpeg()).await;
    assert_eq!(response.status_code(), 201, "upload failed: {}", response.text());
    response.json()
}

pub async fn detect(client: &TestServer, user: &TestUser, image_id: &str) -> TestResponse {
    client
        .post(&format!("/detect/{}", image_id))
        .add_header("Authorization", user.bearer())
        .await
}
