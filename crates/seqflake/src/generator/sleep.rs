use core::time::Duration;

/// A trait that abstracts over how the generator waits while holding its lock.
///
/// The generator backs off when the clock is behind its last timestamp or when
/// a millisecond's sequence space is used up. Production code blocks the
/// thread; tests substitute a provider that advances a fake clock instead, so
/// clock movement is simulated deterministically.
pub trait SleepProvider {
    /// Blocks the calling thread for roughly `dur`.
    fn sleep(&self, dur: Duration);
}

/// An implementation of [`SleepProvider`] using [`std::thread::sleep`].
#[derive(Default, Clone, Copy, Debug)]
pub struct ThreadSleep;

impl SleepProvider for ThreadSleep {
    fn sleep(&self, dur: Duration) {
        std::thread::sleep(dur);
    }
}
