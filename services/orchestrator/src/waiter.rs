//! Poll-until-terminal helper standing in for the SDK waiters.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { initial, max }
    }

    /// Delay before poll number `attempt` (0-based): `initial * 2^attempt`, capped at `max`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

/// Outcome of one status probe.
#[derive(Debug, PartialEq, Eq)]
pub enum Poll<T> {
    Pending,
    Ready(T),
}

/// Calls `probe` until it returns `Poll::Ready`, sleeping with exponential
/// backoff in between. No local timeout: the remote service decides when a
/// job ends. Probe errors end the wait immediately.
pub async fn block_until<T, F, Fut>(backoff: Backoff, mut probe: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let mut attempt: u32 = 0;
    loop {
        if let Poll::Ready(v) = probe().await? {
            return Ok(v);
        }
        let delay = backoff.delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "waiter: not terminal yet");
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
