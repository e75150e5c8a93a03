pub mod auth;
pub mod detect;
pub mod images;
pub mod upload;
pub mod users;
