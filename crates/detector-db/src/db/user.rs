use chrono::Utc;
use detector_core::models::{StoredImage, User};
use detector_core::AppError;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::transaction::with_transaction;

/// Duplicate emails are a client conflict; anything else is a database failure.
fn write_error(e: sqlx::Error, action: &str) -> AppError {
    if e
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
    {
        return AppError::Conflict("Email address is already registered".to_string());
    }
    tracing::error!(error = %e, "Failed to {}", action);
    AppError::Database(e)
}

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. A duplicate email yields `Conflict`.
    #[tracing::instrument(skip(self, password_hash), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let now = Utc::now();

        let user = sqlx::query_as::<Sqlite, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| write_error(e, "create user"))?;

        tracing::info!(user_id = %user.id, username = %user.username, "User created");

        Ok(user)
    }

    #[tracing::instrument(skip(self, email), fields(db.table = "users", db.operation = "select"))]
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Sqlite, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = ?
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get user by email");
            AppError::Database(e)
        })?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Sqlite, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get user by id");
            AppError::Database(e)
        })?;

        Ok(user)
    }

    /// All users, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<Sqlite, User>(
            r#"
            SELECT id, username, email, password_hash, created_at, updated_at
            FROM users
            ORDER BY created_at, rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            AppError::Database(e)
        })
    }

    /// Replace a user's details. `None` when no such user exists.
    #[tracing::instrument(skip(self, email, password_hash), fields(db.table = "users", db.operation = "update", db.record_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Sqlite, User>(
            r#"
            UPDATE users
            SET username = ?, email = ?, password_hash = ?, updated_at = ?
            WHERE id = ?
            RETURNING id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| write_error(e, "update user"))?;

        if user.is_some() {
            tracing::info!(user_id = %id, "User updated");
        }

        Ok(user)
    }

    /// Delete a user together with their images and tags.
    ///
    /// Returns the removed image records so the caller can delete their files,
    /// or `None` if no such user exists.
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "delete", db.record_id = %id))]
    pub async fn delete_by_id(&self, id: Uuid) -> Result<Option<Vec<StoredImage>>, AppError> {
        let deleted = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let images = sqlx::query_as::<Sqlite, StoredImage>(
                    r#"
                    SELECT id, user_id, image_path, source_path, is_detected, created_at
                    FROM user_images
                    WHERE user_id = ?
                    "#,
                )
                .bind(id)
                .fetch_all(&mut **tx)
                .await?;

                // Images and their tags go with the user through ON DELETE CASCADE
                let result = sqlx::query("DELETE FROM users WHERE id = ?")
                    .bind(id)
                    .execute(&mut **tx)
                    .await?;

                Ok((result.rows_affected() > 0).then_some(images))
            })
        })
        .await?;

        if let Some(images) = &deleted {
            tracing::info!(user_id = %id, image_count = images.len(), "User deleted");
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);

        let user = repo
            .create("alice", "alice@example.com", "hash")
            .await
            .unwrap();
        assert_eq!(user.username, "alice");

        let by_email = repo.find_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.password_hash, "hash");

        let by_id = repo.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@example.com");

        assert!(repo.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);

        repo.create("alice", "alice@example.com", "hash")
            .await
            .unwrap();
        let duplicate = repo.create("alice2", "alice@example.com", "hash").await;
        assert!(matches!(duplicate, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_list_and_update_user() {
        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool);

        let alice = repo.create("alice", "alice@example.com", "hash").await.unwrap();
        repo.create("bob", "bob@example.com", "hash").await.unwrap();

        let names: Vec<String> = repo
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let updated = repo
            .update(alice.id, "alicia", "alicia@example.com", "new-hash")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "alicia");
        assert_eq!(updated.password_hash, "new-hash");
        assert!(repo.find_by_email("alice@example.com").await.unwrap().is_none());

        let taken = repo
            .update(alice.id, "alicia", "bob@example.com", "new-hash")
            .await;
        assert!(matches!(taken, Err(AppError::Conflict(_))));

        assert!(repo
            .update(Uuid::new_v4(), "ghost", "ghost@example.com", "hash")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_user_cascades_to_images_and_tags() {
        use crate::db::image::{ImageRepository, SqliteImageRepository};

        let (pool, _dir) = test_pool().await;
        let repo = UserRepository::new(pool.clone());
        let images = SqliteImageRepository::new(pool.clone());

        let alice = repo.create("alice", "alice@example.com", "hash").await.unwrap();
        let bob = repo.create("bob", "bob@example.com", "hash").await.unwrap();
        let image = images.create(alice.id, "a.png").await.unwrap();
        images
            .commit_detection_result(image.id, "a.jpg", &["cat".to_string()])
            .await
            .unwrap();
        let kept = images.create(bob.id, "b.png").await.unwrap();

        let removed = repo.delete_by_id(alice.id).await.unwrap().unwrap();

        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].file_names(), vec!["a.jpg", "a.png"]);
        assert!(repo.find_by_id(alice.id).await.unwrap().is_none());
        assert!(images.find_by_id(image.id).await.unwrap().is_none());
        assert!(images.find_by_id(kept.id).await.unwrap().is_some());
        let tags: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_image_tags")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tags, 0);

        assert!(repo.delete_by_id(alice.id).await.unwrap().is_none());
    }
}
