pub mod detection;
pub mod users;

pub use detection::{DetectionOutcome, DetectionService};
pub use users::UserService;

use detector_storage::Storage;

/// Best-effort file removal once the owning record is settled.
pub(crate) async fn remove_stored_file(storage: &dyn Storage, name: &str) {
    match storage.delete(name).await {
        Ok(true) => tracing::debug!(name = %name, "Removed stored file"),
        Ok(false) => tracing::debug!(name = %name, "Stored file already gone"),
        Err(e) => tracing::warn!(error = %e, name = %name, "Failed to remove stored file"),
    }
}
