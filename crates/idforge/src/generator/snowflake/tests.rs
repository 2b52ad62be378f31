use crate::{
    BEFORE_EPOCH, Error, IdGenStatus, SnowflakeGenerator, SnowflakeId, SystemClock, TimeSource,
};
use core::time::Duration;
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::scope;

struct MockTime {
    millis: u64,
}

impl TimeSource<u64> for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

/// A clock the test moves by hand.
struct SettableTime {
    millis: AtomicU64,
}

impl SettableTime {
    fn new(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource<u64> for SettableTime {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Reports `base` for the first `tick_after` reads and `base + 1` afterwards.
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

#[test]
fn sequence_increments_within_same_tick() {
    let generator = SnowflakeGenerator::new(0, 0, MockTime { millis: 42 }).unwrap();

    let id1 = generator.next_id().unwrap();
    let id2 = generator.next_id().unwrap();
    let id3 = generator.next_id().unwrap();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn first_id_at_time_zero_starts_at_sequence_zero() {
    let generator = SnowflakeGenerator::new(0, 0, MockTime { millis: 0 }).unwrap();
    let id = generator.next_id().unwrap();
    assert_eq!(id.to_raw(), 0);
}

#[test]
fn every_valid_identity_is_accepted_and_decoded() {
    for worker in 0..=31 {
        for datacenter in 0..=31 {
            let generator =
                SnowflakeGenerator::new(worker, datacenter, MockTime { millis: 7 }).unwrap();
            let id = generator.next_id().unwrap();
            assert_eq!(id.worker_id(), worker as u64);
            assert_eq!(id.datacenter_id(), datacenter as u64);
            assert_eq!(id.timestamp(), 7);
            assert!(id.is_valid());
        }
    }
}

#[test]
fn out_of_range_identity_is_rejected() {
    assert!(matches!(
        SnowflakeGenerator::new(32, 0, MockTime { millis: 0 }),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        SnowflakeGenerator::new(0, -1, MockTime { millis: 0 }),
        Err(Error::InvalidArgument { .. })
    ));
}

#[test]
fn composes_documented_bit_layout() {
    let generator = SnowflakeGenerator::new(9, 17, MockTime { millis: 1234 }).unwrap();
    let id = generator.next_id().unwrap();
    assert_eq!(id.to_raw(), (1234 << 22) | (17 << 17) | (9 << 12));
}

#[test]
fn blocks_until_next_millis_when_sequence_exhausted() {
    // Reads 1..=4096 serve the first 4096 ids. The 4097th call reads once,
    // wraps, then spins through three more stale reads before the tick.
    let time = TickAfterReads {
        base: 100,
        tick_after: 4100,
        reads: AtomicU64::new(0),
    };
    let generator = SnowflakeGenerator::new(1, 1, &time).unwrap();

    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = generator.next_id().unwrap();
        assert_eq!(id.timestamp(), 100);
        assert_eq!(id.sequence(), i);
    }

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 101);
    assert_eq!(id.sequence(), 0);
    assert_eq!(time.reads.load(Ordering::SeqCst), 4101);

    let next = generator.next_id().unwrap();
    assert_eq!(next.timestamp(), 101);
    assert_eq!(next.sequence(), 1);
}

#[test]
fn clock_before_epoch_fails_every_call_without_blocking() {
    let clock = SystemClock::with_epoch(Duration::from_millis(u64::MAX / 2));
    let generator = SnowflakeGenerator::new(0, 0, clock).unwrap();

    // More calls than one millisecond of sequence space: none may block.
    for _ in 0..=2 * SnowflakeId::MAX_SEQUENCE + 2 {
        assert_eq!(
            generator.next_id(),
            Err(Error::TimestampOutOfRange {
                millis: BEFORE_EPOCH
            })
        );
    }
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::TimestampOutOfRange {
            millis: BEFORE_EPOCH
        })
    );
}

#[test]
fn timestamp_past_41_bits_is_rejected() {
    let time = SettableTime::new(SnowflakeId::MAX_TIMESTAMP);
    let generator = SnowflakeGenerator::new(3, 4, &time).unwrap();

    let last = generator.next_id().unwrap();
    assert_eq!(last.timestamp(), SnowflakeId::MAX_TIMESTAMP);

    time.set(SnowflakeId::MAX_TIMESTAMP + 1);
    assert_eq!(
        generator.next_id(),
        Err(Error::TimestampOutOfRange {
            millis: SnowflakeId::MAX_TIMESTAMP + 1
        })
    );
    assert!(generator.try_poll_id().is_err());
}

#[test]
fn exhausting_the_last_millisecond_fails_instead_of_wrapping() {
    // The 4097th call wraps on read 4097 and its first spin read is past
    // the range.
    let time = TickAfterReads {
        base: SnowflakeId::MAX_TIMESTAMP,
        tick_after: 4097,
        reads: AtomicU64::new(0),
    };
    let generator = SnowflakeGenerator::new(0, 0, &time).unwrap();

    let mut last = None;
    for _ in 0..=SnowflakeId::MAX_SEQUENCE {
        last = Some(generator.next_id().unwrap());
    }
    let last = last.unwrap();
    assert_eq!(last.sequence(), SnowflakeId::MAX_SEQUENCE);

    assert!(matches!(
        generator.next_id(),
        Err(Error::TimestampOutOfRange { .. })
    ));
    // The clock stays past the range, so every later call fails too.
    assert!(matches!(
        generator.next_id(),
        Err(Error::TimestampOutOfRange { .. })
    ));
}

#[test]
fn clock_regression_reports_magnitude() {
    let time = SettableTime::new(1_000);
    let generator = SnowflakeGenerator::new(0, 0, &time).unwrap();
    generator.next_id().unwrap();

    time.set(995);
    assert_eq!(
        generator.next_id(),
        Err(Error::ClockRegression { behind_ms: 5 })
    );
    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockRegression { behind_ms: 5 })
    );

    // State is untouched by the failed calls.
    time.set(1_000);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 1_000);
    assert_eq!(id.sequence(), 1);
}

#[test]
fn sequence_resets_when_millisecond_advances() {
    let time = SettableTime::new(10);
    let generator = SnowflakeGenerator::new(0, 0, &time).unwrap();
    generator.next_id().unwrap();
    generator.next_id().unwrap();

    time.set(11);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 11);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn poll_returns_pending_when_sequence_exhausted() {
    let time = SettableTime::new(42);
    let generator = SnowflakeGenerator::new(3, 4, &time).unwrap();

    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        match generator.try_poll_id().unwrap() {
            IdGenStatus::Ready { id } => assert_eq!(id.sequence(), i),
            IdGenStatus::Pending { yield_for } => panic!("unexpected pending ({yield_for})"),
        }
    }

    assert_eq!(
        generator.try_poll_id().unwrap(),
        IdGenStatus::Pending { yield_for: 1 }
    );

    time.set(43);
    match generator.try_poll_id().unwrap() {
        IdGenStatus::Ready { id } => {
            assert_eq!(id.timestamp(), 43);
            assert_eq!(id.sequence(), 0);
        }
        IdGenStatus::Pending { .. } => panic!("unexpected pending after tick"),
    }
}

#[test]
fn system_clock_ids_strictly_increase() {
    const TOTAL_IDS: usize = 4096 * 16;

    let generator = SnowflakeGenerator::new(1, 1, SystemClock::default()).unwrap();
    let mut last = generator.next_id().unwrap();
    for _ in 0..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        assert!(id > last, "{id:?} <= {last:?}");
        assert_eq!(id.worker_id(), 1);
        assert_eq!(id.datacenter_id(), 1);
        last = id;
    }
}

#[test]
fn threaded_ids_are_unique() {
    const THREADS: usize = 8;
    const TOTAL_IDS: usize = 4096 * 64;
    const IDS_PER_THREAD: usize = TOTAL_IDS / THREADS;

    let generator = SnowflakeGenerator::new(5, 6, SystemClock::default()).unwrap();
    let seen_ids = Mutex::new(HashSet::with_capacity(TOTAL_IDS));

    scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|| {
                let mut local = Vec::with_capacity(IDS_PER_THREAD);
                for _ in 0..IDS_PER_THREAD {
                    local.push(generator.next_id().unwrap());
                }
                // Each thread observes its own ids in increasing order.
                assert!(local.windows(2).all(|w| w[0] < w[1]));
                seen_ids.lock().unwrap().extend(local);
            });
        }
    });

    let final_count = seen_ids.lock().unwrap().len();
    assert_eq!(final_count, TOTAL_IDS, "Expected {TOTAL_IDS} unique IDs");
}
