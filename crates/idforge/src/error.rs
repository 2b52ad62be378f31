use core::fmt;

/// A result type defaulting to the crate [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `idforge` surfaces to callers.
///
/// Per-attempt store failures are not part of this enum: they are reported as
/// [`StoreError`] and absorbed by the retry loop of [`SequenceGenerator`].
///
/// [`StoreError`]: crate::StoreError
/// [`SequenceGenerator`]: crate::SequenceGenerator
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Construction-time misconfiguration, e.g. a node id outside `[0, 31]`
    /// or an empty endpoint list. Not retryable.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// The clock reported a time earlier than the last issued timestamp.
    #[error("clock moved backwards, refusing to generate id for {behind_ms} milliseconds")]
    ClockRegression { behind_ms: u64 },

    /// The clock reading does not fit the 41-bit timestamp field: the clock is
    /// before the epoch, or more than 2^41 ms (about 69 years) past it.
    #[error("clock reading {millis} ms is outside the timestamp range of the epoch")]
    TimestampOutOfRange { millis: u64 },

    /// Every attempt against every configured counter store failed.
    #[error("can not generate id: all {attempts} attempts failed")]
    GenerationExhausted { attempts: usize },

    /// The generator lock was poisoned by a panicking thread.
    ///
    /// `parking_lot` mutexes do not poison, so this variant only exists
    /// without the `parking-lot` feature.
    #[cfg(not(feature = "parking-lot"))]
    #[error("generator lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub(crate) fn invalid_argument(reason: impl fmt::Display) -> Self {
        Self::InvalidArgument {
            reason: reason.to_string(),
        }
    }
}

#[cfg(not(feature = "parking-lot"))]
use crate::mutex::{MutexGuard, PoisonError};
#[cfg(not(feature = "parking-lot"))]
impl<T> From<PoisonError<MutexGuard<'_, T>>> for Error {
    fn from(_: PoisonError<MutexGuard<'_, T>>) -> Self {
        Self::LockPoisoned
    }
}
