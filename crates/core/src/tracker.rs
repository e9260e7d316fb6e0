//! In-flight request tracking for drain coordination.
//!
//! Every externally visible unit of work holds a [`RequestToken`] between
//! entry and exit. During a restart the coordinator waits on
//! [`RequestTracker::await_drain`] for the count to reach zero; request
//! handlers themselves never block on the tracker, so the per-request cost
//! is two atomic operations whether or not a restart ever happens.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

struct TrackerInner {
    active: AtomicUsize,
    draining: AtomicBool,
    drained: Notify,
}

/// Shared counter of in-flight units of work.
///
/// Cheaply cloneable; all clones observe the same counter.
#[derive(Clone)]
pub struct RequestTracker {
    inner: Arc<TrackerInner>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                active: AtomicUsize::new(0),
                draining: AtomicBool::new(false),
                drained: Notify::new(),
            }),
        }
    }

    /// Register a unit of work.
    ///
    /// Never fails and never blocks; work is tracked even while a restart
    /// is draining. Whether to admit new work during a drain is the host's
    /// policy, decided before calling this.
    pub fn begin(&self) -> RequestToken {
        let active = self.inner.active.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::trace!(active, "Request tracked");
        RequestToken {
            inner: Arc::clone(&self.inner),
            released: false,
        }
    }

    /// Current number of in-flight units of work.
    ///
    /// A point-in-time snapshot; it may be stale by the time the caller
    /// acts on it. [`await_drain`](Self::await_drain) re-checks under
    /// notification and is the only reliable way to wait for zero.
    pub fn active_count(&self) -> usize {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Whether a restart is currently draining requests.
    ///
    /// Set by the coordinator for the duration of an attempt. Hosts that
    /// want to shed incoming work during a restart read this flag; it is a
    /// hint, not an admission gate.
    pub fn is_draining(&self) -> bool {
        self.inner.draining.load(Ordering::Acquire)
    }

    pub(crate) fn set_draining(&self, draining: bool) {
        self.inner.draining.store(draining, Ordering::Release);
    }

    /// Wait until the active count reaches zero or `timeout` elapses.
    ///
    /// Returns `true` when the tracker drained in time. On `false` the
    /// caller decides whether to proceed anyway; outstanding tokens stay
    /// valid either way.
    pub async fn await_drain(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register the waiter before re-checking the count. The reverse
            // order would miss a release that lands between the check and
            // the await.
            let drained = self.inner.drained.notified();
            if self.active_count() == 0 {
                return true;
            }
            if tokio::time::timeout_at(deadline, drained).await.is_err() {
                return self.active_count() == 0;
            }
        }
    }
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one tracked unit of work.
///
/// Releases its slot exactly once: explicitly via [`release`](Self::release)
/// or implicitly on drop, whichever comes first. A panicking request handler
/// therefore still decrements the count when its stack unwinds.
pub struct RequestToken {
    inner: Arc<TrackerInner>,
    released: bool,
}

impl RequestToken {
    /// Release the slot now instead of at drop.
    pub fn release(mut self) {
        self.finish();
    }

    fn finish(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mut observed = self.inner.active.load(Ordering::Acquire);
        loop {
            if observed == 0 {
                // Decrementing past zero would corrupt the drain wait for
                // every later restart; leave the counter at zero and report.
                tracing::error!("Request token released with no active requests");
                return;
            }
            match self.inner.active.compare_exchange_weak(
                observed,
                observed - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => observed = current,
            }
        }

        tracing::trace!(active = observed - 1, "Request released");
        if observed == 1 {
            self.inner.drained.notify_waiters();
        }
    }
}

impl Drop for RequestToken {
    fn drop(&mut self) {
        self.finish();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
