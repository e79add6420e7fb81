//! Leading-edge throttling for high-frequency event sources.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Lets one call through, then rejects calls until `delay` has elapsed.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    /// A throttle whose first call always passes.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    /// Returns true and opens a new window if the previous one has closed.
    pub fn ready(&self) -> bool {
        let now = Instant::now();
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        match *last {
            Some(at) if now.duration_since(at) < self.delay => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }

    /// Length of the window.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }
}

/// Wraps `f` so that it runs at most once per `delay`; extra calls are dropped.
pub fn throttle<T, F>(f: F, delay: Duration) -> impl Fn(T) + Send + Sync
where
    F: Fn(T) + Send + Sync,
{
    let gate = Throttle::new(delay);
    move |arg| {
        if gate.ready() {
            f(arg);
        }
    }
}
