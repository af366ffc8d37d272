//! Commit-or-discard helper shared by the services.

use tracing::warn;

use bookstore_infra::Transaction;

use crate::error::ServiceResult;

/// Commit `tx` when `outcome` is `Ok`, roll it back otherwise.
///
/// A commit failure replaces the successful outcome. A rollback failure is
/// logged and the caller gets `outcome`'s error.
pub(crate) async fn finish<T, Tx>(tx: Tx, outcome: ServiceResult<T>) -> ServiceResult<T>
where
    Tx: Transaction,
{
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err)
        }
    }
}
