// SPDX-FileCopyrightText: 2026 idbridge Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller cancellation and deadlines for backend operations.

use std::future::Future;
use std::time::Duration;

use idbridge_core::IdentityError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs `op` until it completes, `cancel` fires, or `deadline` elapses.
///
/// Dropping the backend future is the only rollback performed: whatever the
/// backend already applied stays applied.
pub(crate) async fn guarded<T, F>(
    operation: &'static str,
    cancel: &CancellationToken,
    deadline: Duration,
    op: F,
) -> Result<T, IdentityError>
where
    F: Future<Output = Result<T, IdentityError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!(operation, "cancelled by caller");
            Err(IdentityError::Cancelled(format!("{operation} cancelled by caller")))
        }
        outcome = tokio::time::timeout(deadline, op) => outcome.unwrap_or_else(|_| {
            debug!(operation, ?deadline, "deadline elapsed");
            Err(IdentityError::Cancelled(format!(
                "{operation} exceeded its {deadline:?} deadline"
            )))
        }),
    }
}
