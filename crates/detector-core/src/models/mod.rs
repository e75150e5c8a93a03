//! Data models for the application

mod image;
mod user;

pub use image::*;
pub use user::*;
