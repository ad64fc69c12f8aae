use core::{cmp::Ordering, fmt, time::Duration};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::{
    Error, Result,
    generator::{Mutex, SleepProvider, ThreadSleep},
    id::SequenceId,
    identity::NodeIdentity,
    rand::{RandSource, ThreadRandom},
    time::{CachedClock, DEFAULT_EPOCH, TimeSource},
};

/// Largest backwards clock step (in ms) the generator waits out instead of
/// failing.
pub const MAX_BACKWARD_DRIFT_MS: u64 = 4;

/// How long to wait for the next millisecond once its sequence space is used
/// up.
const EXHAUSTED_BACKOFF: Duration = Duration::from_millis(1);

/// Mutable generator state. `last_timestamp` is `None` until the first ID.
#[derive(Debug, Default)]
pub(crate) struct GeneratorState {
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// A lock-based generator of [`SequenceId`]s, safe to share across threads.
///
/// Every call to [`try_next_id`] runs under a single mutex, which is the only
/// serialization point and the source of the ordering guarantee: IDs from one
/// generator (and its clones, which share state) strictly increase.
///
/// Within one millisecond the sequence counts up from a random start of 1 or
/// 2. When it wraps, the generator sleeps until the clock ticks over. When the
/// clock reads earlier than the last accepted timestamp by at most
/// [`MAX_BACKWARD_DRIFT_MS`], it sleeps twice the drift and retries; beyond
/// that it fails with [`Error::ClockRegression`]. All waiting happens while
/// the lock is held, so concurrent callers stall rather than race ahead.
///
/// The clock, sleeper and random source are injected. Production code uses
/// [`CachedClock`], [`ThreadSleep`] and [`ThreadRandom`].
///
/// # Example
///
/// ```
/// use seqflake::{CachedClock, SequenceGenerator};
///
/// let generator = SequenceGenerator::new(1, 2, CachedClock::new()).unwrap();
/// let a = generator.try_next_id().unwrap();
/// let b = generator.try_next_id().unwrap();
/// assert!(a < b);
/// assert_eq!((b.group_id(), b.node_id()), (1, 2));
/// ```
///
/// [`try_next_id`]: SequenceGenerator::try_next_id
pub struct SequenceGenerator<T = CachedClock, S = ThreadSleep, R = ThreadRandom>
where
    T: TimeSource,
    S: SleepProvider,
    R: RandSource,
{
    #[cfg(feature = "cache-padded")]
    pub(crate) state: Arc<crossbeam_utils::CachePadded<Mutex<GeneratorState>>>,
    #[cfg(not(feature = "cache-padded"))]
    pub(crate) state: Arc<Mutex<GeneratorState>>,
    identity: NodeIdentity,
    epoch: u64,
    time: T,
    sleep: S,
    rng: R,
}

impl SequenceGenerator {
    /// Creates a generator with a derived identity on the process-wide
    /// [`CachedClock::global`].
    ///
    /// See [`NodeIdentity::derive`] for how the identity is chosen. Deployments
    /// that need guaranteed uniqueness should assign identities explicitly
    /// with [`SequenceGenerator::new`].
    pub fn derived() -> Self {
        Self::with_identity(NodeIdentity::from_system(), CachedClock::global())
    }
}

impl<T: TimeSource> SequenceGenerator<T> {
    /// Creates a generator for an explicit `(group_id, node_id)` using
    /// [`DEFAULT_EPOCH`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentity`] if either id is outside `0..=31`.
    pub fn new(group_id: u64, node_id: u64, time: T) -> Result<Self> {
        Ok(Self::with_identity(NodeIdentity::new(group_id, node_id)?, time))
    }

    /// Creates a generator for an already validated identity using
    /// [`DEFAULT_EPOCH`].
    pub fn with_identity(identity: NodeIdentity, time: T) -> Self {
        Self::from_parts(identity, DEFAULT_EPOCH, time, ThreadSleep, ThreadRandom)
    }
}

impl<T, S, R> SequenceGenerator<T, S, R>
where
    T: TimeSource,
    S: SleepProvider,
    R: RandSource,
{
    /// Creates a generator from every injectable part.
    ///
    /// `epoch` is in milliseconds since the Unix epoch and must not change for
    /// the lifetime of an ID space.
    pub fn from_parts(identity: NodeIdentity, epoch: u64, time: T, sleep: S, rng: R) -> Self {
        let state = Mutex::new(GeneratorState::default());
        Self {
            #[cfg(feature = "cache-padded")]
            state: Arc::new(crossbeam_utils::CachePadded::new(state)),
            #[cfg(not(feature = "cache-padded"))]
            state: Arc::new(state),
            identity,
            epoch,
            time,
            sleep,
            rng,
        }
    }

    /// The identity packed into every ID.
    pub fn identity(&self) -> NodeIdentity {
        self.identity
    }

    /// The epoch (ms since the Unix epoch) timestamps are packed against.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Generates the next ID, waiting inside the lock if the clock is slightly
    /// behind or the current millisecond is full.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock is more than
    ///   [`MAX_BACKWARD_DRIFT_MS`] behind the last accepted timestamp.
    /// - [`Error::TimestampOutOfRange`] if the clock is before the epoch or
    ///   beyond the 41-bit horizon.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    ///
    /// On error the generator state is unchanged.
    pub fn try_next_id(&self) -> Result<SequenceId> {
        let mut state = {
            #[cfg(feature = "parking-lot")]
            {
                self.state.lock()
            }
            #[cfg(not(feature = "parking-lot"))]
            {
                self.state.lock()?
            }
        };

        let mut now = self.time.current_millis();
        let mut exhausted = false;

        let sequence = loop {
            let Some(last) = state.last_timestamp else {
                break self.start_sequence();
            };
            match now.cmp(&last) {
                // The first ID after running out of sequence space starts at
                // zero rather than the random offset.
                Ordering::Greater if exhausted => break 0,
                Ordering::Greater => break self.start_sequence(),
                Ordering::Equal => {
                    let next = (state.sequence + 1) & SequenceId::SEQUENCE_MASK;
                    if next != 0 {
                        break next;
                    }
                    exhausted = true;
                    now = self.cold_wait_for_tick(last);
                }
                Ordering::Less => now = self.cold_clock_behind(now, last)?,
            }
        };

        let timestamp = self.timestamp_delta(now)?;
        state.last_timestamp = Some(now);
        state.sequence = sequence;

        Ok(SequenceId::from_components(
            timestamp,
            u64::from(self.identity.group_id()),
            u64::from(self.identity.node_id()),
            sequence,
        ))
    }

    /// Starting sequence for a new millisecond: 1 or 2, uniformly.
    fn start_sequence(&self) -> u64 {
        1 + self.rng.rand() % 2
    }

    fn timestamp_delta(&self, now: u64) -> Result<u64> {
        now.checked_sub(self.epoch)
            .filter(|delta| *delta <= SequenceId::TIMESTAMP_MASK)
            .ok_or(Error::TimestampOutOfRange { timestamp: now })
    }

    #[cold]
    #[inline(never)]
    fn cold_wait_for_tick(&self, last: u64) -> u64 {
        trace!(last_timestamp = last, "sequence exhausted, waiting for next millisecond");
        self.sleep.sleep(EXHAUSTED_BACKOFF);
        self.time.current_millis()
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(&self, now: u64, last: u64) -> Result<u64> {
        let drift_ms = last - now;
        if drift_ms > MAX_BACKWARD_DRIFT_MS {
            warn!(drift_ms, last_timestamp = last, "clock moved backwards, refusing to generate ids");
            return Err(Error::ClockRegression { drift_ms });
        }
        let backoff_ms = drift_ms * 2;
        trace!(drift_ms, backoff_ms, "clock behind last timestamp, backing off");
        self.sleep.sleep(Duration::from_millis(backoff_ms));
        Ok(self.time.current_millis())
    }
}

impl<T, S, R> Clone for SequenceGenerator<T, S, R>
where
    T: TimeSource + Clone,
    S: SleepProvider + Clone,
    R: RandSource + Clone,
{
    /// Returns a handle sharing this generator's state, so IDs from both stay
    /// unique and ordered.
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            identity: self.identity,
            epoch: self.epoch,
            time: self.time.clone(),
            sleep: self.sleep.clone(),
            rng: self.rng.clone(),
        }
    }
}

impl<T, S, R> fmt::Debug for SequenceGenerator<T, S, R>
where
    T: TimeSource,
    S: SleepProvider,
    R: RandSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceGenerator")
            .field("group_id", &self.identity.group_id())
            .field("node_id", &self.identity.node_id())
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}
