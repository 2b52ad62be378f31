use core::time::Duration;
use std::time::{SystemTime, UNIX_EPOCH};

/// Default epoch: Wednesday, June 28, 2017 00:00:00 UTC
///
/// Every node of a fleet must agree on the epoch. Changing it shifts the
/// timestamp field of every new ID, so it can only be changed by redeploying
/// all generators at once.
pub const DEFAULT_EPOCH: Duration = Duration::from_millis(1_498_608_000_000);

/// Twitter epoch: Thursday, November 4, 2010 1:42:54.657 UTC
pub const TWITTER_EPOCH: Duration = Duration::from_millis(1_288_834_974_657);

/// Discord epoch: Thursday, January 1, 2015 00:00:00 UTC
pub const DISCORD_EPOCH: Duration = Duration::from_millis(1_420_070_400_000);

/// A trait for time sources that return a wall-clock timestamp.
///
/// This abstraction allows you to plug in the system clock or a simulated
/// clock in tests. The unit is **milliseconds** relative to an origin chosen by
/// the implementation.
///
/// # Example
///
/// ```
/// use idforge::TimeSource;
///
/// struct FixedTime;
/// impl TimeSource<u64> for FixedTime {
///     fn current_millis(&self) -> u64 {
///         1234
///     }
/// }
///
/// let time = FixedTime;
/// assert_eq!(time.current_millis(), 1234);
/// ```
pub trait TimeSource<T> {
    /// Returns the current time in milliseconds since the configured epoch.
    fn current_millis(&self) -> T;
}

impl<T, S> TimeSource<T> for &S
where
    S: TimeSource<T> + ?Sized,
{
    fn current_millis(&self) -> T {
        (**self).current_millis()
    }
}

/// A wall-clock time source offset from a fixed epoch.
///
/// Unlike a monotonic clock this reads [`SystemTime`] on every call, so a step
/// backwards of the system clock (e.g. an NTP correction) is visible to the
/// generator, which refuses to issue IDs until time catches up again.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    epoch_millis: u64,
}

impl Default for SystemClock {
    /// Constructs a clock aligned to [`DEFAULT_EPOCH`].
    fn default() -> Self {
        Self::with_epoch(DEFAULT_EPOCH)
    }
}

impl SystemClock {
    /// Constructs a clock using `epoch` (a [`Duration`] since 1970-01-01 UTC)
    /// as the origin.
    ///
    /// # Example
    ///
    /// ```
    /// use idforge::{SystemClock, TimeSource, TWITTER_EPOCH};
    ///
    /// let clock = SystemClock::with_epoch(TWITTER_EPOCH);
    /// assert!(clock.current_millis() > 0);
    /// ```
    pub const fn with_epoch(epoch: Duration) -> Self {
        Self {
            epoch_millis: epoch.as_millis() as u64,
        }
    }

    /// The configured epoch in milliseconds since the Unix epoch.
    pub const fn epoch_millis(&self) -> u64 {
        self.epoch_millis
    }
}

/// Reading reported by [`SystemClock`] when the host clock is before its epoch.
///
/// Larger than any valid timestamp, so generators reject it with
/// [`Error::TimestampOutOfRange`] instead of issuing IDs for a made-up time.
///
/// [`Error::TimestampOutOfRange`]: crate::Error::TimestampOutOfRange
pub const BEFORE_EPOCH: u64 = u64::MAX;

impl TimeSource<u64> for SystemClock {
    /// Milliseconds elapsed since the epoch, or [`BEFORE_EPOCH`] if the host
    /// clock has not reached it yet.
    fn current_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| u64::try_from(d.as_millis()).ok())
            .and_then(|unix_millis| unix_millis.checked_sub(self.epoch_millis))
            .unwrap_or(BEFORE_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_offset_from_epoch() {
        let unix = SystemClock::with_epoch(Duration::ZERO);
        let custom = SystemClock::default();

        let a = unix.current_millis();
        let b = custom.current_millis();
        let c = unix.current_millis();

        let epoch = DEFAULT_EPOCH.as_millis() as u64;
        assert!(a - epoch <= b && b <= c - epoch);
    }

    #[test]
    fn future_epoch_reports_before_epoch() {
        let clock = SystemClock::with_epoch(Duration::from_millis(u64::MAX / 2));
        assert_eq!(clock.current_millis(), BEFORE_EPOCH);
        assert!(BEFORE_EPOCH > crate::SnowflakeId::MAX_TIMESTAMP);
    }
}
