use super::config::LedgerConfig;
use crate::domain::ids::PaymentRequestId;
use crate::error::{LedgerError, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// configured attempt budget is spent.
///
/// Each attempt must re-read whatever it mutates. An attempt that outlives
/// `commit_timeout` is not retried: it may have committed, so the caller gets
/// `CommitTimeout` and has to re-query before trying again.
pub(crate) async fn commit_with_retry<T, F, Fut>(
    config: &LedgerConfig,
    id: PaymentRequestId,
    mut attempt: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = config.max_commit_attempts.max(1);
    let mut tries = 0;
    loop {
        tries += 1;
        match tokio::time::timeout(config.commit_timeout, attempt()).await {
            Err(_elapsed) => {
                warn!(request_id = %id, attempt = tries, "commit timed out, outcome unknown");
                return Err(LedgerError::CommitTimeout(id));
            }
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_retryable() && tries < max_attempts => {
                debug!(request_id = %id, attempt = tries, error = %e, "retrying commit");
            }
            Ok(Err(e)) => {
                if e.is_retryable() {
                    warn!(request_id = %id, attempts = tries, error = %e, "commit retries exhausted");
                }
                return Err(e);
            }
        }
    }
}
