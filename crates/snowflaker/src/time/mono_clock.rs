use core::time::Duration;
use portable_atomic::{AtomicU64, Ordering};
use std::{
    sync::{Arc, OnceLock},
    thread::{self, JoinHandle},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use crate::time::TimeSource;

/// Shared ticker thread that updates every millisecond.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A monotonic time source reporting milliseconds since the Unix epoch.
///
/// The wall clock is sampled once at construction. After that, time advances
/// only by the monotonic [`Instant`] elapsed since startup, so NTP steps or
/// manual clock changes never make it go backward.
///
/// A background thread stores the elapsed milliseconds into a shared atomic
/// once per millisecond, keeping syscalls off the hot path. The thread exits
/// once every clone of the clock has been dropped.
#[derive(Clone, Debug)]
pub struct MonotonicClock {
    inner: Arc<SharedTickerInner>,
    start_millis: u64,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Starts a new ticker anchored at the current wall-clock time.
    ///
    /// A wall clock earlier than 1970 anchors at `0`.
    pub fn new() -> Self {
        let start = Instant::now();
        let start_millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX));

        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(0),
            _handle: OnceLock::new(),
        });

        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let mut tick = 0;

            loop {
                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };

                // Compute the absolute target time of the next tick
                let target = start + Duration::from_millis(tick);

                // Sleep if we are early
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                inner_ref.current.store(now_ms, Ordering::Relaxed);

                // Align to next tick after the current actual time
                tick = now_ms + 1;
            }
        });

        // Freshly created, so the cell is always empty here.
        let _ = inner._handle.set(handle);

        Self {
            inner,
            start_millis,
        }
    }
}

impl TimeSource for MonotonicClock {
    /// Returns the wall-clock anchor plus the monotonic milliseconds elapsed
    /// since construction.
    fn current_millis(&self) -> u64 {
        self.start_millis + self.inner.current.load(Ordering::Relaxed)
    }
}
