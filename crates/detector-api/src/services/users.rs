//! Account management: the user records behind signup and the admin endpoints.
//!
//! Deleting a user removes their images and tags in the same transaction, then
//! the files those images pointed at.

use super::remove_stored_file;
use crate::auth::password::hash_password;
use detector_core::models::User;
use detector_core::AppError;
use detector_db::UserRepository;
use detector_storage::Storage;
use std::sync::Arc;
use uuid::Uuid;

pub const USER_NOT_FOUND_MESSAGE: &str = "User not found";

#[derive(Clone)]
pub struct UserService {
    repository: UserRepository,
    storage: Arc<dyn Storage>,
}

impl UserService {
    pub fn new(repository: UserRepository, storage: Arc<dyn Storage>) -> Self {
        Self {
            repository,
            storage,
        }
    }

    pub async fn list(&self) -> Result<Vec<User>, AppError> {
        self.repository.list().await
    }

    pub async fn get(&self, id: Uuid) -> Result<User, AppError> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))
    }

    /// Register an account. Emails are stored lowercased.
    #[tracing::instrument(skip(self, email, password), fields(username = %username))]
    pub async fn create(&self, username: &str, email: &str, password: &str) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;
        self.repository
            .create(username, &email.to_lowercase(), &password_hash)
            .await
    }

    #[tracing::instrument(skip(self, email, password), fields(user_id = %id))]
    pub async fn update(
        &self,
        id: Uuid,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let password_hash = hash_password(password)?;
        self.repository
            .update(id, username, &email.to_lowercase(), &password_hash)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))
    }

    /// Delete a user, their images and every file behind them.
    #[tracing::instrument(skip(self), fields(user_id = %id))]
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let images = self
            .repository
            .delete_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(USER_NOT_FOUND_MESSAGE.to_string()))?;

        for image in &images {
            for name in image.file_names() {
                remove_stored_file(self.storage.as_ref(), name).await;
            }
        }

        tracing::info!(user_id = %id, image_count = images.len(), "User and images deleted");
        Ok(())
    }
}
