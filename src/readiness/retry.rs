use std::future::Future;
use std::time::Duration;

/// Verdict of a single attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    /// The condition holds; stop with success.
    Succeeded,
    /// Not yet; retry after the backoff if attempts remain.
    Retry,
    /// The condition can never hold any more; stop with failure.
    GiveUp,
}

/// Summary of a [`retry_with_backoff`] run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RetryOutcome {
    /// Whether an attempt succeeded.
    pub succeeded: bool,
    /// Attempts performed.
    pub attempts: u32,
    /// Backoff pauses slept.
    pub backoffs: u32,
}

/// Run `attempt` up to `max_attempts` times, sleeping `delay` between consecutive attempts.
///
/// The attempt closure receives the zero-based attempt index. There is no pause before the first
/// attempt or after the last, so a fully exhausted run sleeps exactly `max_attempts - 1` times.
/// `max_attempts == 0` performs nothing and reports failure.
pub async fn retry_with_backoff<F, Fut>(max_attempts: u32, delay: Duration, mut attempt: F) -> RetryOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt>,
{
    let mut out = RetryOutcome::default();
    for idx in 0..max_attempts {
        if idx > 0 {
            tokio::time::sleep(delay).await;
            out.backoffs += 1;
        }
        out.attempts += 1;
        match attempt(idx).await {
            Attempt::Succeeded => {
                out.succeeded = true;
                return out;
            }
            Attempt::GiveUp => return out,
            Attempt::Retry => {}
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/readiness/retry.rs"]
mod tests;
