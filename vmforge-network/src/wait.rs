//! Bounded readiness polling.
//!
//! Backend resources are fulfilled asynchronously by an external controller,
//! so providers block on an explicit sleep-and-recheck loop: fixed cadence,
//! fixed budget, deadline observed every iteration. There is no internal
//! retry beyond this loop; the outer reconciliation re-invokes the whole
//! pass on failure, so a timeout here simply restarts the wait next pass.

use std::future::Future;
use std::time::Duration;

use crate::error::{NetworkError, Result};
use crate::types::VmContext;

/// Poll cadence while waiting for a backend resource.
pub const RETRY_INTERVAL: Duration = Duration::from_millis(100);

/// Total budget for a backend resource to report readiness.
pub const RETRY_TIMEOUT: Duration = Duration::from_secs(15);

/// Poll `check` until it yields a value, the budget is exhausted, or the
/// caller's deadline passes.
///
/// The first check runs immediately. `check` returning `Ok(None)` means
/// "not yet ready" (including resource-not-found); errors abort the wait.
pub(crate) async fn wait_for_ready<R, F, Fut>(
    ctx: &VmContext,
    kind: &'static str,
    name: &str,
    mut check: F,
) -> Result<R>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<R>>>,
{
    // tokio's clock, so tests can run the 15s budget on a paused clock.
    let started = tokio::time::Instant::now();

    loop {
        if ctx.deadline_expired() {
            return Err(NetworkError::DeadlineExceeded {
                kind,
                name: name.to_string(),
            });
        }

        if let Some(ready) = check().await? {
            return Ok(ready);
        }

        if started.elapsed() >= RETRY_TIMEOUT {
            return Err(NetworkError::WaitTimeout {
                kind,
                name: name.to_string(),
            });
        }

        tokio::time::sleep(RETRY_INTERVAL).await;
    }
}
