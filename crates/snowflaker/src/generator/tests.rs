use crate::{
    ClockPolicy, Config, ConfigError, Error, Event, Level, LockScope, Logger, MonotonicClock,
    NoopLogger, Poll, SnowflakeGenerator, SnowflakeId, TWITTER_EPOCH, TimeSource,
    generator::mutex::{GLOBAL_LOCK, lock},
};
use core::time::Duration;
use rand::Rng;
use std::{
    collections::HashSet,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    },
    thread::scope,
};

const EPOCH: i64 = 1_000;

struct MockTime {
    millis: u64,
}

impl TimeSource for MockTime {
    fn current_millis(&self) -> u64 {
        self.millis
    }
}

struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    fn at(millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(millis),
        }
    }

    fn set(&self, millis: u64) {
        self.millis.store(millis, Ordering::SeqCst);
    }
}

impl TimeSource for ManualClock {
    fn current_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

/// Returns `before` for the first `switch_after` reads, `after` from then on.
struct SteppedClock {
    reads: AtomicUsize,
    switch_after: usize,
    before: u64,
    after: u64,
}

impl TimeSource for SteppedClock {
    fn current_millis(&self) -> u64 {
        if self.reads.fetch_add(1, Ordering::SeqCst) < self.switch_after {
            self.before
        } else {
            self.after
        }
    }
}

#[derive(Default)]
struct CollectingLogger {
    events: Mutex<Vec<Event>>,
}

impl CollectingLogger {
    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, level: Level) -> usize {
        self.events()
            .iter()
            .filter(|event| event.level() == level)
            .count()
    }
}

impl Logger for CollectingLogger {
    fn log(&self, event: &Event) {
        self.events.lock().unwrap().push(*event);
    }
}

trait PollExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Poll {
    fn unwrap_ready(self) -> SnowflakeId {
        match self {
            Self::Ready { id } => id,
            Self::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self {
            Self::Ready { id } => panic!("unexpected ready ({id})"),
            Self::Pending { yield_for } => yield_for,
        }
    }
}

fn config() -> Config {
    Config::new(1, 1).with_custom_epoch_ms(EPOCH)
}

fn generator<T: TimeSource>(config: Config, time: T) -> SnowflakeGenerator<T, NoopLogger> {
    SnowflakeGenerator::try_new(config, time, NoopLogger).unwrap()
}

fn twitter_millis(offset: u64) -> u64 {
    TWITTER_EPOCH.as_millis() as u64 + offset
}

#[test]
fn accepts_max_coordinates() {
    let generator = generator(Config::new(31, 31), MockTime {
        millis: twitter_millis(5),
    });
    let id = generator.next_id().unwrap();
    assert_eq!(id.worker_id(), 31);
    assert_eq!(id.datacenter_id(), 31);
    assert_eq!(generator.worker_id(), 31);
    assert_eq!(generator.datacenter_id(), 31);
}

#[test]
fn rejects_out_of_range_coordinates_without_logging() {
    let logger = CollectingLogger::default();

    let err = SnowflakeGenerator::try_new(Config::new(32, 1), MockTime { millis: 0 }, &logger)
        .unwrap_err();
    assert_eq!(
        err,
        Error::Configuration(ConfigError::InvalidWorkerId {
            worker_id: 32,
            max: 31
        })
    );

    let err = SnowflakeGenerator::try_new(Config::new(1, -1), MockTime { millis: 0 }, &logger)
        .unwrap_err();
    assert_eq!(
        err,
        Error::Configuration(ConfigError::InvalidDatacenterId {
            datacenter_id: -1,
            max: 31
        })
    );

    assert!(logger.events().is_empty());
}

#[test]
fn logs_layout_once_on_start() {
    let logger = CollectingLogger::default();
    let _generator =
        SnowflakeGenerator::try_new(Config::new(7, 3), MockTime { millis: 0 }, &logger).unwrap();

    assert_eq!(
        logger.events(),
        vec![Event::Started {
            timestamp_shift: 22,
            datacenter_id_bits: 5,
            worker_id_bits: 5,
            sequence_bits: 12,
            datacenter_id: 3,
            worker_id: 7,
        }]
    );
}

#[test]
fn logs_trace_event_per_id() {
    let logger = CollectingLogger::default();
    let generator = SnowflakeGenerator::try_new(config(), MockTime { millis: 1042 }, &logger)
        .unwrap();

    for _ in 0..3 {
        generator.next_id().unwrap();
    }

    let generated: Vec<_> = logger
        .events()
        .into_iter()
        .filter(|event| event.level() == Level::Trace)
        .collect();
    let expected: Vec<_> = (0..3)
        .map(|sequence| Event::Generated {
            timestamp: 1042,
            datacenter_id: 1,
            worker_id: 1,
            sequence,
        })
        .collect();
    assert_eq!(generated, expected);
}

#[test]
fn sequence_increments_within_same_tick() {
    let generator = generator(config(), MockTime { millis: 1042 });

    let id1 = generator.try_poll_id().unwrap().unwrap_ready();
    let id2 = generator.try_poll_id().unwrap().unwrap_ready();
    let id3 = generator.try_poll_id().unwrap().unwrap_ready();

    assert_eq!(id1.timestamp(), 42);
    assert_eq!(id2.timestamp(), 42);
    assert_eq!(id3.timestamp(), 42);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn first_id_resets_sequence_start() {
    let generator = generator(config().with_sequence_start(4000), MockTime { millis: 1042 });

    assert_eq!(generator.next_id().unwrap().sequence(), 0);
    assert_eq!(generator.next_id().unwrap().sequence(), 1);
}

#[test]
fn pending_when_sequence_exhausted() {
    let generator = generator(config(), MockTime { millis: 1042 });

    for _ in 0..=SnowflakeId::MAX_SEQUENCE {
        generator.try_poll_id().unwrap().unwrap_ready();
    }

    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
    // Still exhausted, nothing was consumed by the pending poll.
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
}

#[test]
fn rollover_resets_sequence_on_next_millisecond() {
    let generator = generator(config(), SteppedClock {
        reads: AtomicUsize::new(0),
        switch_after: 4097,
        before: 1042,
        after: 1043,
    });

    for i in 0..=SnowflakeId::MAX_SEQUENCE {
        let id = generator
            .next_id_with(|_| panic!("unexpected wait"))
            .unwrap();
        assert_eq!(id.sequence(), i);
        assert_eq!(id.timestamp(), 42);
    }

    let mut waits = Vec::new();
    let id = generator.next_id_with(|yield_for| waits.push(yield_for)).unwrap();
    assert_eq!(waits, vec![1]);
    assert_eq!(id.sequence(), 0);
    assert_eq!(id.timestamp(), 43);
}

#[test]
fn relative_timestamp_is_offset_from_custom_epoch() {
    let generator = generator(Config::default(), MockTime {
        millis: twitter_millis(1000),
    });

    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 1000);
    assert_eq!(
        id.unix_millis(generator.custom_epoch_ms()),
        twitter_millis(1000)
    );
}

#[test]
fn every_coordinate_pair_round_trips() {
    for worker_id in 0..=31 {
        for datacenter_id in 0..=31 {
            let generator = generator(
                Config::new(worker_id, datacenter_id).with_custom_epoch_ms(EPOCH),
                MockTime { millis: 5000 },
            );
            for sequence in 0..3 {
                let id = generator.next_id().unwrap();
                assert_eq!(id.worker_id(), worker_id as u64);
                assert_eq!(id.datacenter_id(), datacenter_id as u64);
                assert_eq!(id.sequence(), sequence);
                assert_eq!(id.timestamp(), 4000);
            }
        }
    }
}

#[test]
fn clock_before_epoch_fails_without_touching_state() {
    let clock = ManualClock::at(500);
    let generator = generator(config(), &clock);

    assert_eq!(
        generator.try_poll_id(),
        Err(Error::ClockBeforeEpoch {
            now: 500,
            epoch: 1000
        })
    );

    clock.set(1500);
    let id = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(id.timestamp(), 500);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn timestamp_overflow_is_reported() {
    let at_limit = generator(Config::new(1, 1).with_custom_epoch_ms(0), MockTime {
        millis: SnowflakeId::MAX_TIMESTAMP,
    });
    assert_eq!(
        at_limit.next_id().unwrap().timestamp(),
        SnowflakeId::MAX_TIMESTAMP
    );

    let past_limit = generator(Config::new(1, 1).with_custom_epoch_ms(0), MockTime {
        millis: SnowflakeId::MAX_TIMESTAMP + 1,
    });
    assert_eq!(
        past_limit.next_id(),
        Err(Error::TimestampOverflow {
            timestamp: SnowflakeId::MAX_TIMESTAMP + 1,
            max: SnowflakeId::MAX_TIMESTAMP,
        })
    );
}

#[test]
fn default_clock_policy_waits() {
    assert_eq!(Config::default().clock_policy, ClockPolicy::Wait);

    let clock = ManualClock::at(2000);
    let generator = generator(config(), &clock);
    assert_eq!(generator.clock_policy(), ClockPolicy::Wait);

    generator.next_id().unwrap();
    clock.set(1500);
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 500);
}

#[test]
fn wait_policy_blocks_until_clock_catches_up() {
    let clock = ManualClock::at(2000);
    let logger = CollectingLogger::default();
    let generator = SnowflakeGenerator::try_new(
        config().with_clock_policy(ClockPolicy::Wait),
        &clock,
        &logger,
    )
    .unwrap();

    let first = generator.next_id().unwrap();

    clock.set(1500);
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 500);
    clock.set(1999);
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 1);
    // One stall, one fatal event.
    assert_eq!(logger.count(Level::Fatal), 1);
    assert_eq!(
        logger.events().last(),
        Some(&Event::ClockRegressed {
            now: 1500,
            last_timestamp: 2000
        })
    );

    // The blocking helper sleeps (here: advances the clock) through the stall.
    let mut waits = Vec::new();
    let second = generator
        .next_id_with(|yield_for| {
            waits.push(yield_for);
            clock.set(clock.current_millis() + yield_for);
        })
        .unwrap();
    assert_eq!(waits, vec![1]);
    assert!(second > first);
    assert_eq!(second.timestamp(), 1000);
    assert_eq!(second.sequence(), 1);

    // A new regression is a new stall.
    clock.set(1900);
    assert_eq!(generator.try_poll_id().unwrap().unwrap_pending(), 100);
    assert_eq!(logger.count(Level::Fatal), 2);
}

#[test]
fn fail_policy_surfaces_regression() {
    let clock = ManualClock::at(2000);
    let logger = CollectingLogger::default();
    let generator = SnowflakeGenerator::try_new(
        config().with_clock_policy(ClockPolicy::Fail),
        &clock,
        &logger,
    )
    .unwrap();

    let first = generator.next_id().unwrap();

    clock.set(1500);
    let expected = Error::ClockRegression {
        now: 1500,
        last_timestamp: 2000,
    };
    assert_eq!(generator.try_poll_id(), Err(expected.clone()));
    assert_eq!(generator.next_id(), Err(expected));
    assert_eq!(logger.count(Level::Fatal), 2);

    // Retry succeeds once the clock has caught up.
    clock.set(2000);
    let second = generator.next_id().unwrap();
    assert!(second > first);
    assert_eq!(second.sequence(), 1);
}

#[test]
fn log_and_continue_policy_reuses_regressed_timestamp() {
    let clock = ManualClock::at(2000);
    let logger = CollectingLogger::default();
    let generator = SnowflakeGenerator::try_new(
        config().with_clock_policy(ClockPolicy::LogAndContinue),
        &clock,
        &logger,
    )
    .unwrap();

    let first = generator.next_id().unwrap();

    clock.set(1999);
    let regressed = generator.try_poll_id().unwrap().unwrap_ready();
    assert_eq!(regressed.timestamp(), 999);
    assert_eq!(regressed.sequence(), 0);
    assert!(regressed < first);
    assert_eq!(logger.count(Level::Fatal), 1);

    // Returning to the already-used millisecond restarts its sequence: the
    // compatibility mode hands out the same ID twice.
    clock.set(2000);
    let replayed = generator.next_id().unwrap();
    assert_eq!(replayed, first);
}

#[test]
fn ids_strictly_increase_with_monotonic_clock() {
    const TOTAL_IDS: usize = 4096 * 64;

    let generator = generator(Config::default(), MonotonicClock::default());
    let mut last = generator.next_id().unwrap();

    for _ in 1..TOTAL_IDS {
        let id = generator.next_id().unwrap();
        assert!(id > last, "{id:?} is not greater than {last:?}");
        if id.timestamp() == last.timestamp() {
            assert_eq!(id.sequence(), last.sequence() + 1);
        } else {
            assert_eq!(id.sequence(), 0);
        }
        assert_eq!(id.worker_id(), 1);
        assert_eq!(id.datacenter_id(), 1);
        last = id;
    }
}

#[test]
fn concurrent_callers_get_distinct_ids() {
    let mut rng = rand::rng();
    let threads = rng.random_range(2..=num_cpus::get().clamp(2, 8));
    let per_thread = rng.random_range(1_000..=20_000_usize);

    let generator = generator(Config::default(), MonotonicClock::default());

    let batches: Vec<Vec<SnowflakeId>> = scope(|s| {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                s.spawn(|| {
                    (0..per_thread)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    // Each thread observes its own IDs in issuance order.
    for batch in &batches {
        assert!(batch.windows(2).all(|pair| pair[0] < pair[1]));
    }

    let unique: HashSet<_> = batches.iter().flatten().copied().collect();
    assert_eq!(
        unique.len(),
        threads * per_thread,
        "duplicates with {threads} threads x {per_thread} IDs"
    );
}

#[test]
fn global_scope_generators_stay_unique() {
    const THREADS: usize = 4;
    const IDS_PER_THREAD: usize = 4096 * 4;

    let clock = MonotonicClock::default();
    let left = generator(
        Config::new(1, 1).with_lock_scope(LockScope::Global),
        clock.clone(),
    );
    let right = generator(Config::new(2, 1).with_lock_scope(LockScope::Global), clock);

    let ids: Vec<SnowflakeId> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let generator = if i % 2 == 0 { &left } else { &right };
                s.spawn(move || {
                    (0..IDS_PER_THREAD)
                        .map(|_| generator.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), THREADS * IDS_PER_THREAD);
    assert!(ids.iter().all(|id| id.worker_id() == 1 || id.worker_id() == 2));
}

#[test]
fn global_scope_serializes_across_instances() {
    let global = generator(
        config().with_lock_scope(LockScope::Global),
        MockTime { millis: 2000 },
    );
    let instance = generator(Config::new(2, 1).with_custom_epoch_ms(EPOCH), MockTime {
        millis: 2000,
    });
    let done = AtomicBool::new(false);

    let guard = lock(&GLOBAL_LOCK).unwrap();
    scope(|s| {
        let handle = s.spawn(|| {
            let id = global.next_id().unwrap();
            done.store(true, Ordering::SeqCst);
            id
        });

        // Instance-scoped generators never touch the process-wide lock.
        assert_eq!(instance.next_id().unwrap().worker_id(), 2);

        std::thread::sleep(Duration::from_millis(50));
        assert!(!done.load(Ordering::SeqCst));

        drop(guard);
        assert_eq!(handle.join().unwrap().worker_id(), 1);
    });
    assert!(done.load(Ordering::SeqCst));
}

#[test]
fn lock_scope_does_not_change_output() {
    let instance = generator(config(), MockTime { millis: 3000 });
    let global = generator(
        config().with_lock_scope(LockScope::Global),
        MockTime { millis: 3000 },
    );

    for _ in 0..16 {
        assert_eq!(instance.next_id().unwrap(), global.next_id().unwrap());
    }
}
