use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic time source used to bound polling loops.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Host monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same time. With a non-zero auto-advance step every [`Clock::now`] call
/// moves time forward by that step, so a busy-wait loop observes time passing without
/// anything else driving it.
#[derive(Debug, Clone, Default)]
pub struct FakeClock {
    now_ns: Arc<AtomicU64>,
    step_ns: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a clock that advances by `step` on every read.
    pub fn with_auto_advance(step: Duration) -> Self {
        let clock = Self::new();
        clock.set_auto_advance(step);
        clock
    }

    pub fn set_auto_advance(&self, step: Duration) {
        self.step_ns
            .store(duration_to_ns(step), Ordering::SeqCst);
    }

    pub fn advance(&self, delta: Duration) {
        self.now_ns
            .fetch_add(duration_to_ns(delta), Ordering::SeqCst);
    }

    /// Current time without advancing.
    pub fn peek(&self) -> Duration {
        Duration::from_nanos(self.now_ns.load(Ordering::SeqCst))
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        let step = self.step_ns.load(Ordering::SeqCst);
        Duration::from_nanos(self.now_ns.fetch_add(step, Ordering::SeqCst))
    }
}

fn duration_to_ns(d: Duration) -> u64 {
    u64::try_from(d.as_nanos()).unwrap_or(u64::MAX)
}
