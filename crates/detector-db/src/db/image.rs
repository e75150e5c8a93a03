use async_trait::async_trait;
use chrono::Utc;
use detector_core::models::{DetectionTag, ImageWithTags, StoredImage};
use detector_core::AppError;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;
use uuid::Uuid;

use super::transaction::with_transaction;

/// Persistence operations the upload/detect workflow depends on.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredImage>, AppError>;

    /// Insert a fresh `Uploaded` record pointing at `image_path`.
    async fn create(&self, user_id: Uuid, image_path: &str) -> Result<StoredImage, AppError>;

    /// Tag names for one image, in insertion order.
    async fn find_tags(&self, image_id: Uuid) -> Result<Vec<String>, AppError>;

    /// Every image with its owner's username and tags, newest first.
    async fn list_with_tags(&self) -> Result<Vec<ImageWithTags>, AppError>;

    /// Images having at least one tag containing `query` (case-insensitive), newest first.
    async fn search_by_tag(&self, query: &str) -> Result<Vec<ImageWithTags>, AppError>;

    /// Remove an image record and its tags in one transaction.
    ///
    /// Returns the deleted record so the caller can clean up its files, or `None`
    /// if no such record exists.
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<StoredImage>, AppError>;

    /// Atomically record a finished detection: point the image at `new_path`,
    /// mark it detected and insert one tag per label.
    ///
    /// Either every change lands or none does. An image that is already
    /// detected (or no longer exists) yields `Conflict`/`NotFound` and is left
    /// untouched.
    async fn commit_detection_result(
        &self,
        image_id: Uuid,
        new_path: &str,
        labels: &[String],
    ) -> Result<StoredImage, AppError>;
}

#[derive(Debug, FromRow)]
struct ImageUserRow {
    #[sqlx(flatten)]
    image: StoredImage,
    username: String,
}

/// SQLite-backed [`ImageRepository`]
#[derive(Clone)]
pub struct SqliteImageRepository {
    pool: SqlitePool,
}

impl SqliteImageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fetch tags for the given images in a single query and attach them.
    async fn attach_tags(&self, rows: Vec<ImageUserRow>) -> Result<Vec<ImageWithTags>, AppError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, image_id, tag_name FROM user_image_tags WHERE image_id IN (",
        );
        let mut separated = builder.separated(", ");
        for row in &rows {
            separated.push_bind(row.image.id);
        }
        separated.push_unseparated(") ORDER BY rowid");

        let tags = builder
            .build_query_as::<DetectionTag>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to load image tags");
                AppError::Database(e)
            })?;

        let mut by_image: HashMap<Uuid, Vec<String>> = HashMap::new();
        for tag in tags {
            by_image.entry(tag.image_id).or_default().push(tag.tag_name);
        }

        Ok(rows
            .into_iter()
            .map(|row| ImageWithTags {
                tags: by_image.remove(&row.image.id).unwrap_or_default(),
                image: row.image,
                username: row.username,
            })
            .collect())
    }
}

#[async_trait]
impl ImageRepository for SqliteImageRepository {
    #[tracing::instrument(skip(self), fields(db.table = "user_images", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<StoredImage>, AppError> {
        let image = sqlx::query_as::<Sqlite, StoredImage>(
            r#"
            SELECT id, user_id, image_path, source_path, is_detected, created_at
            FROM user_images
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get image by id");
            AppError::Database(e)
        })?;

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_images", db.operation = "insert"))]
    async fn create(&self, user_id: Uuid, image_path: &str) -> Result<StoredImage, AppError> {
        let image = sqlx::query_as::<Sqlite, StoredImage>(
            r#"
            INSERT INTO user_images (id, user_id, image_path, source_path, is_detected, created_at)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING id, user_id, image_path, source_path, is_detected, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(image_path)
        .bind(image_path)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create image record");
            AppError::Database(e)
        })?;

        tracing::info!(
            image_id = %image.id,
            user_id = %user_id,
            image_path = %image.image_path,
            "Image record created"
        );

        Ok(image)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_image_tags", db.operation = "select", db.record_id = %image_id))]
    async fn find_tags(&self, image_id: Uuid) -> Result<Vec<String>, AppError> {
        let tags = sqlx::query_scalar::<Sqlite, String>(
            r#"
            SELECT tag_name FROM user_image_tags
            WHERE image_id = ?
            ORDER BY rowid
            "#,
        )
        .bind(image_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get image tags");
            AppError::Database(e)
        })?;

        Ok(tags)
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_images", db.operation = "select"))]
    async fn list_with_tags(&self) -> Result<Vec<ImageWithTags>, AppError> {
        let rows = sqlx::query_as::<Sqlite, ImageUserRow>(
            r#"
            SELECT i.id, i.user_id, i.image_path, i.source_path, i.is_detected, i.created_at,
                   u.username
            FROM user_images i
            JOIN users u ON u.id = i.user_id
            ORDER BY i.created_at DESC, i.rowid DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list images");
            AppError::Database(e)
        })?;

        self.attach_tags(rows).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_images", db.operation = "select"))]
    async fn search_by_tag(&self, query: &str) -> Result<Vec<ImageWithTags>, AppError> {
        let rows = sqlx::query_as::<Sqlite, ImageUserRow>(
            r#"
            SELECT i.id, i.user_id, i.image_path, i.source_path, i.is_detected, i.created_at,
                   u.username
            FROM user_images i
            JOIN users u ON u.id = i.user_id
            WHERE EXISTS (
                SELECT 1 FROM user_image_tags t
                WHERE t.image_id = i.id AND instr(lower(t.tag_name), lower(?)) > 0
            )
            ORDER BY i.created_at DESC, i.rowid DESC
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to search images by tag");
            AppError::Database(e)
        })?;

        self.attach_tags(rows).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "user_images", db.operation = "delete", db.record_id = %id))]
    async fn delete_by_id(&self, id: Uuid) -> Result<Option<StoredImage>, AppError> {
        let deleted = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let existing = sqlx::query_as::<Sqlite, StoredImage>(
                    r#"
                    SELECT id, user_id, image_path, source_path, is_detected, created_at
                    FROM user_images
                    WHERE id = ?
                    "#,
                )
                .bind(id)
                .fetch_optional(&mut **tx)
                .await?;

                let Some(image) = existing else {
                    return Ok(None);
                };

                sqlx::query("DELETE FROM user_image_tags WHERE image_id = ?")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;

                sqlx::query("DELETE FROM user_images WHERE id = ?")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;

                Ok(Some(image))
            })
        })
        .await?;

        if deleted.is_some() {
            tracing::info!(image_id = %id, "Image record deleted");
        }

        Ok(deleted)
    }

    #[tracing::instrument(skip(self, labels), fields(db.table = "user_images", db.operation = "update", db.record_id = %image_id, tag_count = labels.len()))]
    async fn commit_detection_result(
        &self,
        image_id: Uuid,
        new_path: &str,
        labels: &[String],
    ) -> Result<StoredImage, AppError> {
        let new_path = new_path.to_string();
        let labels = labels.to_vec();

        let image = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let updated = sqlx::query_as::<Sqlite, StoredImage>(
                    r#"
                    UPDATE user_images
                    SET image_path = ?, is_detected = 1
                    WHERE id = ? AND is_detected = 0
                    RETURNING id, user_id, image_path, source_path, is_detected, created_at
                    "#,
                )
                .bind(new_path.as_str())
                .bind(image_id)
                .fetch_optional(&mut **tx)
                .await?;

                let Some(image) = updated else {
                    let exists = sqlx::query_scalar::<Sqlite, i64>(
                        "SELECT COUNT(*) FROM user_images WHERE id = ?",
                    )
                    .bind(image_id)
                    .fetch_one(&mut **tx)
                    .await?;

                    return Err(if exists > 0 {
                        AppError::Conflict("Image has already been processed".to_string())
                    } else {
                        AppError::NotFound(detector_core::error::IMAGE_NOT_FOUND_MESSAGE.to_string())
                    });
                };

                for label in &labels {
                    sqlx::query(
                        r#"
                        INSERT INTO user_image_tags (id, image_id, tag_name)
                        VALUES (?, ?, ?)
                        "#,
                    )
                    .bind(Uuid::new_v4())
                    .bind(image_id)
                    .bind(label)
                    .execute(&mut **tx)
                    .await?;
                }

                Ok(image)
            })
        })
        .await?;

        tracing::info!(
            image_id = %image_id,
            image_path = %image.image_path,
            "Detection result committed"
        );

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_user, test_pool};

    #[tokio::test]
    async fn test_create_starts_uploaded() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "alice").await;
        let repo = SqliteImageRepository::new(pool);

        let image = repo.create(user_id, "a.png").await.unwrap();
        assert!(!image.is_detected);
        assert_eq!(image.image_path, "a.png");
        assert_eq!(image.source_path, "a.png");

        let found = repo.find_by_id(image.id).await.unwrap().unwrap();
        assert_eq!(found.id, image.id);
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_commit_detection_result() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "alice").await;
        let repo = SqliteImageRepository::new(pool);
        let image = repo.create(user_id, "a.png").await.unwrap();

        let labels = vec!["cat".to_string(), "dog".to_string()];
        let updated = repo
            .commit_detection_result(image.id, "b.jpg", &labels)
            .await
            .unwrap();

        assert!(updated.is_detected);
        assert_eq!(updated.image_path, "b.jpg");
        assert_eq!(updated.source_path, "a.png");
        assert_eq!(repo.find_tags(image.id).await.unwrap(), labels);
    }

    #[tokio::test]
    async fn test_commit_rolls_back_on_duplicate_tag() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "alice").await;
        let repo = SqliteImageRepository::new(pool);
        let image = repo.create(user_id, "a.png").await.unwrap();

        let labels = vec!["cat".to_string(), "cat".to_string()];
        let result = repo.commit_detection_result(image.id, "b.jpg", &labels).await;
        assert!(matches!(result, Err(AppError::Database(_))));

        let unchanged = repo.find_by_id(image.id).await.unwrap().unwrap();
        assert!(!unchanged.is_detected);
        assert_eq!(unchanged.image_path, "a.png");
        assert!(repo.find_tags(image.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_twice_conflicts() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "alice").await;
        let repo = SqliteImageRepository::new(pool);
        let image = repo.create(user_id, "a.png").await.unwrap();

        repo.commit_detection_result(image.id, "b.jpg", &["cat".to_string()])
            .await
            .unwrap();
        let second = repo
            .commit_detection_result(image.id, "c.jpg", &["dog".to_string()])
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let missing = repo
            .commit_detection_result(Uuid::new_v4(), "d.jpg", &[])
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));

        let current = repo.find_by_id(image.id).await.unwrap().unwrap();
        assert_eq!(current.image_path, "b.jpg");
        assert_eq!(repo.find_tags(image.id).await.unwrap(), vec!["cat"]);
    }

    #[tokio::test]
    async fn test_list_and_search() {
        let (pool, _dir) = test_pool().await;
        let alice = insert_user(&pool, "alice").await;
        let bob = insert_user(&pool, "bob").await;
        let repo = SqliteImageRepository::new(pool);

        let first = repo.create(alice, "a.png").await.unwrap();
        let second = repo.create(bob, "b.png").await.unwrap();
        repo.commit_detection_result(first.id, "a.jpg", &["Traffic Light".to_string()])
            .await
            .unwrap();

        let all = repo.list_with_tags().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].image.id, second.id);
        assert_eq!(all[0].username, "bob");
        assert!(all[0].tags.is_empty());
        assert_eq!(all[1].tags, vec!["Traffic Light"]);

        let hits = repo.search_by_tag("light").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].image.id, first.id);
        assert_eq!(hits[0].username, "alice");

        assert!(repo.search_by_tag("giraffe").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_id_removes_tags() {
        let (pool, _dir) = test_pool().await;
        let user_id = insert_user(&pool, "alice").await;
        let repo = SqliteImageRepository::new(pool.clone());
        let image = repo.create(user_id, "a.png").await.unwrap();
        repo.commit_detection_result(image.id, "b.jpg", &["cat".to_string()])
            .await
            .unwrap();

        let deleted = repo.delete_by_id(image.id).await.unwrap().unwrap();
        assert_eq!(deleted.file_names(), vec!["b.jpg", "a.png"]);
        assert!(repo.find_by_id(image.id).await.unwrap().is_none());

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_image_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);

        assert!(repo.delete_by_id(image.id).await.unwrap().is_none());
    }
}
