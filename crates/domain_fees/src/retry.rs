//! Optimistic-concurrency retries

use std::future::Future;
use std::time::Duration;
use tracing::warn;

use core_kernel::FeeId;

use crate::error::FeeError;

const BACKOFF_BASE_MS: u64 = 5;
const BACKOFF_MAX_MS: u64 = 200;

/// Runs `attempt` until it stops failing with a stale fee version
///
/// Each attempt must re-read the fee it writes. Lost races back off for a
/// jittered, exponentially growing delay before the next attempt. Gives up
/// with `ConcurrentModification` after `max_attempts` lost races.
pub(crate) async fn retry_on_conflict<T, F, Fut>(
    fee_id: FeeId,
    max_attempts: u32,
    mut attempt: F,
) -> Result<T, FeeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FeeError>>,
{
    let max_attempts = max_attempts.max(1);

    for n in 1..=max_attempts {
        match attempt().await {
            Err(FeeError::Storage(err)) if err.is_stale_version() => {
                if n == max_attempts {
                    break;
                }
                let delay = backoff_delay(n);
                warn!(
                    %fee_id,
                    attempt = n,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Fee changed underneath the operation, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            result => return result,
        }
    }

    Err(FeeError::ConcurrentModification {
        fee_id,
        attempts: max_attempts,
    })
}

/// Delay after the `attempt`-th lost race: half the exponential step plus a
/// random share of the other half
fn backoff_delay(attempt: u32) -> Duration {
    let step = BACKOFF_BASE_MS
        .saturating_mul(2_u64.saturating_pow(attempt.saturating_sub(1)))
        .min(BACKOFF_MAX_MS);
    let floor = step / 2;
    Duration::from_millis(floor + fastrand::u64(0..=step - floor))
}
