use std::sync::Arc;

/// Default epoch: Tuesday, February 27, 2018 14:12:57.809 UTC, in
/// milliseconds since the Unix epoch.
///
/// Every deployment sharing an ID space must use the same epoch; IDs packed
/// against different epochs do not order against each other.
pub const DEFAULT_EPOCH: u64 = 1_519_740_777_809;

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the [`CachedClock`], a direct
/// system clock read, or a mocked time source in tests.
///
/// The unit is **milliseconds since the Unix epoch**. The generator subtracts
/// its own epoch before packing.
///
/// # Example
///
/// ```
/// use seqflake::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1_700_000_000_000
///     }
/// }
///
/// assert_eq!(FixedTime.current_millis(), 1_700_000_000_000);
/// ```
///
/// [`CachedClock`]: crate::time::CachedClock
pub trait TimeSource {
    /// Returns the current time in milliseconds since the Unix epoch.
    fn current_millis(&self) -> u64;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}

impl<T: TimeSource + ?Sized> TimeSource for Arc<T> {
    fn current_millis(&self) -> u64 {
        (**self).current_millis()
    }
}
