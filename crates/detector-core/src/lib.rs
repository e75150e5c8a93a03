//! Detector Core Library
//!
//! Domain models, error types and configuration shared by every detector crate.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{Config, DetectorConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
