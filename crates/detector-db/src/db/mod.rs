//! Database repositories for data access layer
//!
//! `image` covers uploaded images and their detection tags, `user` covers
//! accounts. Multi-statement writes go through `transaction::with_transaction`.

pub mod image;
pub mod transaction;
pub mod user;

pub use image::{ImageRepository, SqliteImageRepository};
pub use user::UserRepository;
