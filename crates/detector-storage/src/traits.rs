//! Storage abstraction trait

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte stream returned by [`Storage::load_stream`]
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StorageError>> + Send>>;

/// Image file store.
///
/// Files are addressed by names the store generates itself. Callers keep the
/// returned name and hand it back for every later operation.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Persist `data` under a fresh `{uuid}.{extension}` name and return that name.
    async fn save(&self, data: Vec<u8>, extension: &str) -> StorageResult<String>;

    /// Read a whole file. A missing file is [`StorageError::NotFound`].
    async fn load(&self, name: &str) -> StorageResult<Vec<u8>>;

    /// Remove a file. Returns `false` when there was nothing to remove.
    async fn delete(&self, name: &str) -> StorageResult<bool>;

    /// Check if a file exists
    async fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Read a file as a stream of chunks, for serving it over HTTP.
    async fn load_stream(&self, name: &str) -> StorageResult<ByteStream>;
}
