/// A result type defaulting to the crate-wide [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors `seqflake` can surface to a caller.
///
/// Best-effort conditions (such as failing to read network metadata while
/// deriving a [`NodeIdentity`]) are absorbed internally and never appear here.
///
/// [`NodeIdentity`]: crate::identity::NodeIdentity
#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A group id or node id does not fit its 5-bit field.
    #[error("invalid node identity (group_id={group_id}, node_id={node_id}): both must be in 0..=31")]
    InvalidIdentity {
        /// The requested group id.
        group_id: u64,
        /// The requested node id.
        node_id: u64,
    },

    /// The clock moved backwards further than the generator is willing to
    /// wait out.
    ///
    /// The generator state is left untouched, so a later call with a
    /// corrected clock succeeds normally.
    #[error("clock moved backwards by {drift_ms} ms, refusing to generate ids")]
    ClockRegression {
        /// How far behind the last accepted timestamp the clock was.
        drift_ms: u64,
    },

    /// The clock reading is before the configured epoch or past the 41-bit
    /// timestamp horizon.
    #[error("timestamp {timestamp} ms is outside the representable range")]
    TimestampOutOfRange {
        /// The offending clock reading, in milliseconds since the Unix epoch.
        timestamp: u64,
    },

    /// A [`CachedClock`] was configured with a zero refresh period.
    ///
    /// [`CachedClock`]: crate::time::CachedClock
    #[error("clock refresh period must be greater than zero")]
    InvalidClockPeriod,

    /// The operation failed because the generator lock was **poisoned**.
    ///
    /// This occurs when a thread panics while holding the lock. When the
    /// `parking-lot` feature is enabled, mutexes do **not** poison, so this
    /// variant is not available.
    #[cfg_attr(docsrs, doc(cfg(not(feature = "parking-lot"))))]
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

#[cfg(not(feature = "parking-lot"))]
use crate::generator::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
