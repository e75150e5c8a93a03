//! Application state and sub-state extractors.
//!
//! Handlers extract only the sub-state they need via Axum's `FromRef`.

use crate::auth::jwt::JwtService;
use crate::services::{DetectionService, UserService};
use detector_db::UserRepository;
use detector_storage::Storage;
use sqlx::SqlitePool;
use std::sync::Arc;

/// Database pool and the repositories not owned by a service.
#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub user_repository: UserRepository,
}

/// Image workflow and the store its files live in.
#[derive(Clone)]
pub struct ImageState {
    pub detection: DetectionService,
    pub storage: Arc<dyn Storage>,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt: JwtService,
}

/// Main application state: aggregates sub-states for dependency injection.
#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub images: ImageState,
    pub users: UserService,
    pub auth: AuthConfig,
}

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for ImageState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.images.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for AuthConfig {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.auth.clone()
    }
}

fn _assert_app_state_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<AppState>();
    assert_sync::<AppState>();
}
