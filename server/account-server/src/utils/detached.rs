//! Run session mutations on their own task.
//!
//! A dropped handler future (client disconnect) would otherwise cancel a
//! registry write halfway through login, refresh or logout. The spawned task
//! runs to completion regardless; the handler only awaits its outcome.

use auth_identity::{IdentityError, Result};
use std::future::Future;

pub async fn run_detached<F, T>(operation: F) -> Result<T>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation)
        .await
        .map_err(|e| IdentityError::Internal(anyhow::anyhow!("session task failed: {e}")))?
}
