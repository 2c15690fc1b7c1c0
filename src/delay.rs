//! Delay primitive used by "wait" steps.
//!
//! The sequencer itself never waits. A delay step hands its continuation to a
//! [`Scheduler`], which calls it back once the delay has elapsed on whatever
//! run loop the host provides.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;

/// Callback handed to a [`Scheduler`].
pub type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Host run loop that can call back after a delay.
pub trait Scheduler: Send + Sync {
    /// Call `callback` exactly once after `delay`.
    ///
    /// A zero delay must call it synchronously, before returning.
    fn schedule_after(&self, delay: Duration, callback: Callback);
}

// ============================================================================
// Manual Scheduler
// ============================================================================

/// Scheduler driven by explicit clock ticks.
///
/// Nothing fires until the host calls [`ManualScheduler::advance`]. Useful for
/// hosts with their own frame loop, and for deterministic tests.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<Clock>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_seq: u64,
    timers: Vec<Timer>,
}

struct Timer {
    due: Duration,
    seq: u64,
    callback: Callback,
}

impl ManualScheduler {
    /// Create a scheduler whose clock starts at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed on this scheduler's clock.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of callbacks that have not fired yet.
    pub fn pending(&self) -> usize {
        self.clock.lock().timers.len()
    }

    /// Move the clock forward by `by`, firing every callback that comes due,
    /// earliest first. Callbacks scheduled while firing are honored if they
    /// fall inside the window. Returns the number of callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.lock().now.saturating_add(by);
        let mut fired = 0;

        loop {
            let timer = {
                let mut clock = self.clock.lock();
                let next = clock
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.seq))
                    .map(|(index, _)| index);

                match next {
                    Some(index) => {
                        let timer = clock.timers.swap_remove(index);
                        clock.now = clock.now.max(timer.due);
                        timer
                    }
                    None => {
                        clock.now = target;
                        return fired;
                    }
                }
            };

            (timer.callback)();
            fired += 1;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_after(&self, delay: Duration, callback: Callback) {
        if delay.is_zero() {
            callback();
            return;
        }

        let mut clock = self.clock.lock();
        let due = clock.now.saturating_add(delay);
        let seq = clock.next_seq;
        clock.next_seq += 1;
        clock.timers.push(Timer { due, seq, callback });
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.timers.len())
            .finish()
    }
}

// ============================================================================
// Tokio Scheduler
// ============================================================================

/// Scheduler backed by `tokio::time::sleep` on a runtime handle.
#[cfg(feature = "tokio")]
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioScheduler {
    /// Schedule on the given runtime.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Schedule on the runtime of the calling context, if there is one.
    pub fn current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

#[cfg(feature = "tokio")]
impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, callback: Callback) {
        if delay.is_zero() {
            callback();
            return;
        }

        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
    }
}
