use std::time::Duration;

use async_trait::async_trait;

/// Linear backoff: one `unit` per failed attempt so far.
///
/// `failures` is the number of attempts that have failed, so the delay
/// before attempt 2 is one unit, before attempt 3 two units, and so on.
pub fn linear_backoff(failures: usize, unit: Duration) -> Duration {
    let factor = u32::try_from(failures).unwrap_or(u32::MAX);
    unit.saturating_mul(factor)
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}
