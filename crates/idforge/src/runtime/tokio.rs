use core::{future::Future, time::Duration};

use crate::{IdGenStatus, Result, SnowflakeGenerator, SnowflakeId, TimeSource};

/// Extension trait for generating Snowflake IDs on the
/// [`tokio`](https://docs.rs/tokio) runtime.
///
/// Instead of spinning while the per-millisecond sequence is exhausted, the
/// returned future sleeps on tokio's timer and polls again, leaving the worker
/// thread free for other tasks.
pub trait SnowflakeGeneratorAsyncTokioExt {
    /// Returns a future that resolves to the next available Snowflake ID.
    ///
    /// # Errors
    ///
    /// Resolves to an error if the generator reports one, e.g.
    /// [`Error::ClockRegression`]. Errors are not retried.
    ///
    /// [`Error::ClockRegression`]: crate::Error::ClockRegression
    fn try_next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>>;
}

impl<T> SnowflakeGeneratorAsyncTokioExt for SnowflakeGenerator<T>
where
    T: TimeSource<u64>,
{
    fn try_next_id_async(&self) -> impl Future<Output = Result<SnowflakeId>> {
        async move {
            loop {
                let dur = match self.try_poll_id()? {
                    IdGenStatus::Ready { id } => return Ok(id),
                    IdGenStatus::Pending { yield_for } => Duration::from_millis(yield_for),
                };
                ::tokio::time::sleep(dur).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, SystemClock};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicU64, Ordering};

    struct TickAfterReads {
        base: u64,
        tick_after: u64,
        reads: AtomicU64,
    }

    impl TimeSource<u64> for TickAfterReads {
        fn current_millis(&self) -> u64 {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if read <= self.tick_after {
                self.base
            } else {
                self.base + 1
            }
        }
    }

    #[tokio::test]
    async fn sleeps_through_exhausted_sequence() {
        let time = TickAfterReads {
            base: 7,
            tick_after: 4097,
            reads: AtomicU64::new(0),
        };
        let generator = SnowflakeGenerator::new(2, 3, &time).unwrap();

        for _ in 0..=SnowflakeId::MAX_SEQUENCE {
            let id = generator.try_next_id_async().await.unwrap();
            assert_eq!(id.timestamp(), 7);
        }

        let id = generator.try_next_id_async().await.unwrap();
        assert_eq!(id.timestamp(), 8);
        assert_eq!(id.sequence(), 0);
    }

    #[tokio::test]
    async fn system_clock_ids_are_unique() {
        const TOTAL_IDS: usize = 4096 * 8;

        let generator = SnowflakeGenerator::new(1, 1, SystemClock::default()).unwrap();
        let mut seen = HashSet::with_capacity(TOTAL_IDS);
        for _ in 0..TOTAL_IDS {
            assert!(seen.insert(generator.try_next_id_async().await.unwrap()));
        }
    }

    #[tokio::test]
    async fn clock_regression_is_not_retried() {
        struct Backwards(AtomicU64);
        impl TimeSource<u64> for Backwards {
            fn current_millis(&self) -> u64 {
                self.0.fetch_sub(3, Ordering::SeqCst)
            }
        }

        let generator = SnowflakeGenerator::new(0, 0, Backwards(AtomicU64::new(100))).unwrap();
        generator.try_next_id_async().await.unwrap();
        assert_eq!(
            generator.try_next_id_async().await,
            Err(Error::ClockRegression { behind_ms: 3 })
        );
    }
}
