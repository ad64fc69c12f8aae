use core::time::Duration;
use std::{
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Instant, SystemTime, UNIX_EPOCH},
};

use tracing::debug;

use crate::{Error, Result, time::TimeSource};

static GLOBAL: OnceLock<CachedClock> = OnceLock::new();

/// Shared ticker state written by the refresh thread.
#[derive(Debug)]
struct SharedTickerInner {
    current: AtomicU64,
    _handle: OnceLock<JoinHandle<()>>,
}

/// A wall-clock time source that is refreshed by a background thread instead
/// of being read on every call.
///
/// Reading `SystemTime::now()` on every ID becomes a measurable cost under
/// heavy concurrent load. `CachedClock` trades up to one refresh period of
/// staleness for a single relaxed atomic load on the hot path.
///
/// The clock is a cheap, clonable handle. The refresh thread only holds a weak
/// reference and exits once every handle has been dropped. Use
/// [`CachedClock::global`] for a process-wide instance that lives until the
/// process exits.
///
/// The cached value follows the system wall clock, so it can step backwards if
/// the wall clock is adjusted. [`SequenceGenerator`] tolerates small
/// regressions and rejects large ones.
///
/// [`SequenceGenerator`]: crate::generator::SequenceGenerator
#[derive(Clone, Debug)]
pub struct CachedClock {
    inner: Arc<SharedTickerInner>,
    period: Duration,
}

impl Default for CachedClock {
    fn default() -> Self {
        Self::new()
    }
}

impl CachedClock {
    /// Refresh period used by [`CachedClock::new`] and
    /// [`CachedClock::global`].
    pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1);

    /// Starts a clock refreshed every [`Self::DEFAULT_PERIOD`].
    pub fn new() -> Self {
        Self::spawn(Self::DEFAULT_PERIOD)
    }

    /// Starts a clock refreshed every `period`.
    ///
    /// The cached value is seeded with a real reading before this returns, so
    /// it is valid even before the first tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClockPeriod`] if `period` is zero.
    ///
    /// # Example
    ///
    /// ```
    /// use std::time::Duration;
    /// use seqflake::{CachedClock, TimeSource};
    ///
    /// let clock = CachedClock::with_period(Duration::from_millis(2)).unwrap();
    /// assert!(clock.current_millis() > 0);
    /// ```
    pub fn with_period(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(Error::InvalidClockPeriod);
        }
        Ok(Self::spawn(period))
    }

    /// Returns the process-wide clock, starting it on first use.
    ///
    /// The global instance is never dropped, so its refresh thread runs for
    /// the lifetime of the process.
    pub fn global() -> Self {
        GLOBAL.get_or_init(Self::new).clone()
    }

    /// Returns how often the cached value is refreshed.
    pub fn period(&self) -> Duration {
        self.period
    }

    fn spawn(period: Duration) -> Self {
        let inner = Arc::new(SharedTickerInner {
            current: AtomicU64::new(system_millis()),
            _handle: OnceLock::new(),
        });

        let period_nanos = u64::try_from(period.as_nanos()).unwrap_or(u64::MAX);
        let weak_inner = Arc::downgrade(&inner);
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let mut tick: u64 = 1;

            loop {
                // Compute the absolute target time of the next tick
                let target = start + Duration::from_nanos(period_nanos.saturating_mul(tick));

                // Sleep if we are early
                let now = Instant::now();
                if now < target {
                    thread::sleep(target - now);
                }

                let Some(inner_ref) = weak_inner.upgrade() else {
                    break;
                };
                inner_ref.current.store(system_millis(), Ordering::Relaxed);
                drop(inner_ref);

                // Skip any ticks we overslept through
                let elapsed = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
                tick = elapsed / period_nanos + 1;
            }

            debug!("cached clock refresh thread stopped");
        });

        // Freshly created, so the cell is always empty here.
        let _ = inner._handle.set(handle);
        debug!(period_us = period.as_micros() as u64, "cached clock started");

        Self { inner, period }
    }
}

impl TimeSource for CachedClock {
    /// Returns the most recently cached wall-clock reading.
    fn current_millis(&self) -> u64 {
        self.inner.current.load(Ordering::Relaxed)
    }
}

/// Milliseconds since the Unix epoch, or zero if the system clock is set
/// before it.
fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_close_to_system_time() {
        let clock = CachedClock::new();
        let cached = clock.current_millis();
        let system = system_millis();
        assert!(system >= cached);
        assert!(system - cached < 1_000, "cached={cached} system={system}");
    }

    #[test]
    fn refreshes_in_background() {
        let clock = CachedClock::new();
        let first = clock.current_millis();
        thread::sleep(Duration::from_millis(25));
        let second = clock.current_millis();
        assert!(second > first, "first={first} second={second}");
    }

    #[test]
    fn zero_period_is_rejected() {
        assert_eq!(
            CachedClock::with_period(Duration::ZERO).unwrap_err(),
            Error::InvalidClockPeriod
        );
    }

    #[test]
    fn clones_share_one_ticker() {
        let clock = CachedClock::with_period(Duration::from_millis(5)).unwrap();
        let other = clock.clone();
        assert!(Arc::ptr_eq(&clock.inner, &other.inner));
        assert_eq!(other.period(), Duration::from_millis(5));
    }

    #[test]
    fn global_is_a_singleton() {
        let a = CachedClock::global();
        let b = CachedClock::global();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_eq!(a.period(), CachedClock::DEFAULT_PERIOD);
    }

    #[test]
    fn ticker_releases_state_after_last_handle_drops() {
        let clock = CachedClock::new();
        let weak = Arc::downgrade(&clock.inner);
        drop(clock);

        // The thread may hold a strong reference for the duration of one
        // store; give it a few ticks to let go and exit.
        for _ in 0..100 {
            if weak.upgrade().is_none() {
                return;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("ticker state still alive after dropping every handle");
    }
}
