//! Per-card readiness channel and the bounded wait used before capture.
//!
//! A [`ReadinessSignal`] is owned by exactly one mounted card. Waiters hold a cheap
//! [`ReadinessHandle`] and register a listener only for the duration of a single wait attempt;
//! listeners are released on every exit path (ready, timeout, card dropped, waiter cancelled).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use crate::foundation::config::ReadinessPolicy;

pub mod retry;

pub use retry::{Attempt, RetryOutcome, retry_with_backoff};

/// Pause between wait attempts when callers do not choose one.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(250);

#[derive(Debug, Default)]
struct ListenerCounters {
    registered: AtomicUsize,
    active: AtomicUsize,
}

/// Snapshot of listener bookkeeping for a signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Listeners ever registered.
    pub registered: usize,
    /// Listeners currently registered.
    pub active: usize,
}

/// Sending half: flips `not-ready → ready` at most once.
#[derive(Debug)]
pub struct ReadinessSignal {
    tx: watch::Sender<bool>,
    counters: Arc<ListenerCounters>,
}

impl Default for ReadinessSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx,
            counters: Arc::new(ListenerCounters::default()),
        }
    }

    /// Mark ready. Returns `true` only for the call that performed the transition.
    pub fn mark_ready(&self) -> bool {
        self.tx.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        })
    }

    pub fn is_ready(&self) -> bool {
        *self.tx.borrow()
    }

    /// A handle waiters can hold independently of the card's lifetime.
    pub fn handle(&self) -> ReadinessHandle {
        ReadinessHandle {
            rx: self.tx.subscribe(),
            counters: Arc::clone(&self.counters),
        }
    }
}

/// Receiving half held by waiters.
#[derive(Clone, Debug)]
pub struct ReadinessHandle {
    rx: watch::Receiver<bool>,
    counters: Arc<ListenerCounters>,
}

impl ReadinessHandle {
    pub fn is_ready(&self) -> bool {
        *self.rx.borrow()
    }

    /// The owning card is gone; readiness can no longer change.
    pub fn is_closed(&self) -> bool {
        self.rx.has_changed().is_err()
    }

    pub fn listener_stats(&self) -> ListenerStats {
        ListenerStats {
            registered: self.counters.registered.load(Ordering::Acquire),
            active: self.counters.active.load(Ordering::Acquire),
        }
    }

    fn listen(&self) -> Listener {
        self.counters.registered.fetch_add(1, Ordering::AcqRel);
        self.counters.active.fetch_add(1, Ordering::AcqRel);
        Listener {
            rx: self.rx.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

struct Listener {
    rx: watch::Receiver<bool>,
    counters: Arc<ListenerCounters>,
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.counters.active.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Parameters of a readiness wait.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitOptions {
    /// Bound on each attempt.
    pub timeout: Duration,
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Pause between attempts.
    pub backoff: Duration,
}

impl WaitOptions {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }
}

/// Wait for a card to report readiness.
///
/// Returns `false` instead of failing once all attempts are exhausted or the card was unmounted;
/// callers proceed with a warning in that case.
pub async fn wait_until_ready(handle: &ReadinessHandle, timeout: Duration, max_retries: u32) -> bool {
    wait_until_ready_with(handle, WaitOptions::new(timeout, max_retries))
        .await
        .succeeded
}

/// [`wait_until_ready`] with an explicit backoff, reporting attempt counts.
#[tracing::instrument(level = "debug", skip(handle))]
pub async fn wait_until_ready_with(handle: &ReadinessHandle, opts: WaitOptions) -> RetryOutcome {
    if handle.is_ready() {
        return RetryOutcome {
            succeeded: true,
            attempts: 0,
            backoffs: 0,
        };
    }

    let outcome = retry_with_backoff(opts.max_retries.saturating_add(1), opts.backoff, |idx| {
        let mut listener = handle.listen();
        async move {
            let waited = tokio::time::timeout(opts.timeout, listener.rx.wait_for(|ready| *ready))
                .await
                .map(|r| r.is_ok());
            match waited {
                Ok(true) => Attempt::Succeeded,
                Ok(false) => {
                    tracing::debug!(attempt = idx, "card unmounted while waiting for readiness");
                    Attempt::GiveUp
                }
                Err(_) => {
                    tracing::debug!(attempt = idx, "readiness wait attempt timed out");
                    Attempt::Retry
                }
            }
        }
    })
    .await;

    if !outcome.succeeded {
        tracing::warn!(attempts = outcome.attempts, "card readiness not observed");
    }
    outcome
}

/// Permission to rasterize a card.
///
/// Normally built by [`CaptureGate::decide`]. The variants are public, so the gate is a statement
/// of intent rather than proof: `CaptureEngine::capture` still decodes every card image and fails a
/// `Confirmed` capture on the first one that is not loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureGate {
    /// Readiness was observed.
    Confirmed,
    /// Readiness was not observed; the policy allows proceeding anyway.
    Degraded,
}

impl CaptureGate {
    /// Combine a wait result with the configured policy. `None` means do not capture.
    pub fn decide(ready: bool, policy: ReadinessPolicy) -> Option<Self> {
        match (ready, policy) {
            (true, _) => Some(Self::Confirmed),
            (false, ReadinessPolicy::ProceedWithWarning) => Some(Self::Degraded),
            (false, ReadinessPolicy::Abort) => None,
        }
    }
}

#[cfg(test)]
#[path = "../tests/unit/readiness/wait.rs"]
mod tests;
