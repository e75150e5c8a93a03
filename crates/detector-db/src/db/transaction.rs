//! Database transaction utilities
//!
//! Multi-step writes (detection commit, image deletion) run through
//! [`with_transaction`] so they either apply completely or not at all.

use detector_core::AppError;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::pin::Pin;

/// Execute a closure within a database transaction
///
/// Begins a transaction, runs the closure with it, and commits on success.
/// Any error returned by the closure rolls the transaction back and is passed
/// through unchanged.
///
/// The closure must own everything it captures (clone before moving in).
///
/// ```ignore
/// use detector_db::with_transaction;
///
/// with_transaction(&pool, |tx| {
///     Box::pin(async move {
///         sqlx::query("UPDATE ...").execute(&mut **tx).await?;
///         sqlx::query("INSERT ...").execute(&mut **tx).await?;
///         Ok(())
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<T, F>(pool: &SqlitePool, f: F) -> Result<T, AppError>
where
    F: for<'a> FnOnce(
        &'a mut Transaction<'_, Sqlite>,
    ) -> Pin<
        Box<dyn std::future::Future<Output = Result<T, AppError>> + Send + 'a>,
    >,
{
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        AppError::Database(e)
    })?;

    match f(&mut tx).await {
        Ok(result) => {
            tx.commit().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to commit transaction");
                AppError::Database(e)
            })?;
            Ok(result)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    original_error = %e,
                    "Failed to rollback transaction"
                );
            }
            Err(e)
        }
    }
}
