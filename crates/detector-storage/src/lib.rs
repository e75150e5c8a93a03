//! Detector Storage Library
//!
//! Filesystem storage for uploaded and annotated images.
//!
//! # Name format
//!
//! Stored files are addressed by flat generated names, `{uuid-v4}.{extension}`.
//! Names never come from the client and must not contain path separators or `..`.

pub(crate) mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use keys::{extension_of, RENDERED_EXTENSION};
pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
