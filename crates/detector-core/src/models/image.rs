use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Route prefix under which stored files are served.
pub const IMAGE_URL_PREFIX: &str = "/images";

/// Detection lifecycle of a stored image.
///
/// `Uploaded` moves to `Detected` exactly once; deletion removes the record entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ImageStatus {
    Uploaded,
    Detected,
}

/// Persisted image record.
///
/// `image_path` points at the file currently shown for the image: the original
/// upload until detection succeeds, the annotated JPEG afterwards. `source_path`
/// always keeps the original upload so deletion can remove both files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StoredImage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub image_path: String,
    pub source_path: String,
    pub is_detected: bool,
    pub created_at: DateTime<Utc>,
}

impl StoredImage {
    pub fn status(&self) -> ImageStatus {
        if self.is_detected {
            ImageStatus::Detected
        } else {
            ImageStatus::Uploaded
        }
    }

    /// Every stored file backing this record, without duplicates.
    pub fn file_names(&self) -> Vec<&str> {
        if self.image_path == self.source_path {
            vec![self.image_path.as_str()]
        } else {
            vec![self.image_path.as_str(), self.source_path.as_str()]
        }
    }
}

/// Label attached to an image by a successful detection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DetectionTag {
    pub id: Uuid,
    pub image_id: Uuid,
    pub tag_name: String,
}

/// Image joined with its owner's username and its tags, in insertion order.
#[derive(Debug, Clone)]
pub struct ImageWithTags {
    pub image: StoredImage,
    pub username: String,
    pub tags: Vec<String>,
}

/// Image as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    pub image_path: String,
    /// Relative URL the file is served from
    #[schema(example = "/images/0b6a5b8e-3c0f-4a43-9f38-2f1c7c6f1f0e.jpg")]
    pub url: String,
    pub status: ImageStatus,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl ImageResponse {
    pub fn new(image: StoredImage, username: Option<String>, tags: Vec<String>) -> Self {
        Self {
            id: image.id,
            user_id: image.user_id,
            username,
            url: format!("{}/{}", IMAGE_URL_PREFIX, image.image_path),
            status: image.status(),
            image_path: image.image_path,
            tags,
            created_at: image.created_at,
        }
    }
}

impl From<ImageWithTags> for ImageResponse {
    fn from(value: ImageWithTags) -> Self {
        ImageResponse::new(value.image, Some(value.username), value.tags)
    }
}
