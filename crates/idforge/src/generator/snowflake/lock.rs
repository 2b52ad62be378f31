use core::cmp::Ordering;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{
    Error, IdGenStatus, NodeIdentity, Result, SnowflakeId, SystemClock, TimeSource,
    mutex::{self, Mutex},
};

/// Mutable clock state: the last issued timestamp and its sequence.
///
/// `last_timestamp` is `None` until the first ID is issued.
#[derive(Clone, Copy, Debug, Default)]
struct ClockState {
    last_timestamp: Option<u64>,
    sequence: u64,
}

/// A lock-based Snowflake ID generator suitable for multi-threaded
/// environments.
///
/// The whole read-compare-update-compose step runs under a single [`Mutex`],
/// so concurrent callers observe a strictly serialized `(timestamp, sequence)`
/// stream and no two calls can produce the same pair.
///
/// ## Behavior
/// - Same millisecond: the 12-bit sequence increments. When it wraps, the call
///   blocks (spinning, with the lock held) until the clock moves past the last
///   timestamp.
/// - Later millisecond: the sequence resets to 0.
/// - Earlier millisecond: [`Error::ClockRegression`] is returned. Nothing is
///   retried, since reusing an old timestamp could duplicate IDs.
/// - A reading outside the 41-bit timestamp field (before the epoch, or past
///   its end): [`Error::TimestampOutOfRange`] is returned.
///
/// ## See Also
/// - [`SequenceGenerator`] for store-backed sequences
///
/// [`SequenceGenerator`]: crate::SequenceGenerator
pub struct SnowflakeGenerator<T = SystemClock>
where
    T: TimeSource<u64>,
{
    node: NodeIdentity,
    state: Mutex<ClockState>,
    time: T,
}

impl<T> SnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    /// Creates a new [`SnowflakeGenerator`] for the given worker and
    /// datacenter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if either id is outside `[0, 31]`.
    ///
    /// # Example
    /// ```
    /// use idforge::{SnowflakeGenerator, SystemClock};
    ///
    /// let generator = SnowflakeGenerator::new(1, 2, SystemClock::default()).unwrap();
    /// let id = generator.next_id().unwrap();
    /// assert_eq!(id.worker_id(), 1);
    /// assert_eq!(id.datacenter_id(), 2);
    ///
    /// assert!(SnowflakeGenerator::new(32, 0, SystemClock::default()).is_err());
    /// ```
    pub fn new(worker_id: i64, datacenter_id: i64, time: T) -> Result<Self> {
        let node = NodeIdentity::new(datacenter_id, worker_id)?;
        Ok(Self::with_identity(node, time))
    }

    /// Creates a new [`SnowflakeGenerator`] from an already validated
    /// [`NodeIdentity`].
    pub fn with_identity(node: NodeIdentity, time: T) -> Self {
        Self {
            node,
            state: Mutex::new(ClockState::default()),
            time,
        }
    }

    pub const fn identity(&self) -> NodeIdentity {
        self.node
    }

    /// Generates the next ID, blocking for up to about a millisecond if the
    /// sequence space of the current millisecond is exhausted.
    ///
    /// # Errors
    ///
    /// - [`Error::ClockRegression`] if the clock is behind the last issued
    ///   timestamp. The error carries how far behind it is.
    /// - [`Error::TimestampOutOfRange`] if the reading does not fit the
    ///   timestamp field.
    /// - [`Error::LockPoisoned`] if another thread panicked while holding the
    ///   lock (std mutex only).
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn next_id(&self) -> Result<SnowflakeId> {
        let mut state = mutex::lock(&self.state)?;
        let now = self.read_clock()?;

        let (timestamp, sequence) = match state.last_timestamp {
            None => (now, 0),
            Some(last) => match now.cmp(&last) {
                Ordering::Less => return Err(Self::cold_clock_behind(now, last)),
                Ordering::Equal => match (state.sequence + 1) & SnowflakeId::MAX_SEQUENCE {
                    0 => (self.block_till_next_millis(last)?, 0),
                    next => (now, next),
                },
                Ordering::Greater => (now, 0),
            },
        };

        state.last_timestamp = Some(timestamp);
        state.sequence = sequence;
        Ok(self.compose(timestamp, sequence))
    }

    /// Attempts to generate the next ID without blocking.
    ///
    /// Returns [`IdGenStatus::Pending`] instead of waiting when the sequence is
    /// exhausted; the state is left untouched in that case so the next poll
    /// after the clock advances starts a fresh millisecond.
    ///
    /// # Errors
    ///
    /// Same as [`Self::next_id`].
    ///
    /// # Example
    /// ```
    /// use idforge::{IdGenStatus, SnowflakeGenerator, SystemClock};
    ///
    /// let generator = SnowflakeGenerator::new(0, 0, SystemClock::default()).unwrap();
    ///
    /// let id = loop {
    ///     match generator.try_poll_id().unwrap() {
    ///         IdGenStatus::Ready { id } => break id,
    ///         IdGenStatus::Pending { .. } => std::thread::yield_now(),
    ///     }
    /// };
    /// assert!(id.is_valid());
    /// ```
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn try_poll_id(&self) -> Result<IdGenStatus> {
        let mut state = mutex::lock(&self.state)?;
        let now = self.read_clock()?;

        let last_timestamp = state.last_timestamp;
        let sequence = match last_timestamp {
            Some(last) => match now.cmp(&last) {
                Ordering::Less => return Err(Self::cold_clock_behind(now, last)),
                Ordering::Equal if state.sequence == SnowflakeId::MAX_SEQUENCE => {
                    return Ok(IdGenStatus::Pending { yield_for: 1 });
                }
                Ordering::Equal => state.sequence + 1,
                Ordering::Greater => 0,
            },
            None => 0,
        };

        state.sequence = sequence;
        state.last_timestamp = Some(now);
        Ok(IdGenStatus::Ready {
            id: self.compose(now, sequence),
        })
    }

    fn compose(&self, timestamp: u64, sequence: u64) -> SnowflakeId {
        SnowflakeId::from_components(
            timestamp,
            self.node.datacenter_id(),
            self.node.worker_id(),
            sequence,
        )
    }

    fn read_clock(&self) -> Result<u64> {
        let now = self.time.current_millis();
        if now > SnowflakeId::MAX_TIMESTAMP {
            return Err(Self::cold_out_of_range(now));
        }
        Ok(now)
    }

    /// Spins until the clock is strictly past `last`. Called with the lock
    /// held so no other caller can observe the wrapped sequence. Gives up if
    /// the clock leaves the timestamp range while waiting.
    fn block_till_next_millis(&self, last: u64) -> Result<u64> {
        loop {
            let now = self.read_clock()?;
            if now > last {
                return Ok(now);
            }
            core::hint::spin_loop();
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, last: u64) -> Error {
        let behind_ms = last - now;
        #[cfg(feature = "tracing")]
        tracing::error!(behind_ms, "clock moved backwards");
        Error::ClockRegression { behind_ms }
    }

    #[cold]
    #[inline(never)]
    fn cold_out_of_range(millis: u64) -> Error {
        #[cfg(feature = "tracing")]
        tracing::error!(millis, "clock reading outside the timestamp range");
        Error::TimestampOutOfRange { millis }
    }
}
