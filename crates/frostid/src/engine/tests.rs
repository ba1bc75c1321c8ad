use core::cell::Cell;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread::scope;
use std::time::Duration;

use crate::store::testing::MemoryStateStore;
use crate::{
    AtomicGenerator, BasicGenerator, ClockSource, Error, GenerationState, GeneratorIdentity,
    IdGenerator, IdPoll, LockGenerator, Result, SnowflakeId, SystemClock, WaitPolicy,
};

/// 2020-01-01 UTC.
const TEST_EPOCH: u64 = 1_577_836_800_000;

fn identity() -> GeneratorIdentity {
    GeneratorIdentity::new(TEST_EPOCH, 1, 2).unwrap()
}

/// A manually driven clock.
#[derive(Debug)]
struct MockClock {
    now: Cell<u64>,
}

impl MockClock {
    fn at(now: u64) -> Self {
        Self { now: Cell::new(now) }
    }

    fn set(&self, now: u64) {
        self.now.set(now);
    }

    fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }
}

impl ClockSource for MockClock {
    fn now_millis(&self) -> u64 {
        self.now.get()
    }
}

/// Returns `base` for the first `frozen_reads` reads, then gains one
/// millisecond per read. Lets blocking waits resolve without real sleeping.
struct FlowingClock {
    base: u64,
    frozen_reads: u64,
    reads: Cell<u64>,
}

impl FlowingClock {
    fn new(base: u64, frozen_reads: u64) -> Self {
        Self {
            base,
            frozen_reads,
            reads: Cell::new(0),
        }
    }
}

impl ClockSource for FlowingClock {
    fn now_millis(&self) -> u64 {
        let reads = self.reads.get() + 1;
        self.reads.set(reads);
        self.base + reads.saturating_sub(self.frozen_reads)
    }
}

/// Replays a fixed series of readings, repeating the last one.
struct ReplayClock {
    values: Vec<u64>,
    index: Cell<usize>,
}

impl ReplayClock {
    fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            index: Cell::new(0),
        }
    }
}

impl ClockSource for ReplayClock {
    fn now_millis(&self) -> u64 {
        let i = self.index.get();
        self.index.set(i + 1);
        self.values[i.min(self.values.len() - 1)]
    }
}

trait PollExt {
    fn unwrap_ready(self) -> SnowflakeId;
    fn unwrap_pending(self) -> u64;
}

impl PollExt for Result<IdPoll> {
    fn unwrap_ready(self) -> SnowflakeId {
        match self.unwrap() {
            IdPoll::Ready { id } => id,
            IdPoll::Pending { yield_for } => {
                panic!("unexpected pending (yield for: {yield_for})")
            }
        }
    }

    fn unwrap_pending(self) -> u64 {
        match self.unwrap() {
            IdPoll::Ready { id } => panic!("unexpected ready ({id})"),
            IdPoll::Pending { yield_for } => yield_for,
        }
    }
}

fn run_sequence_increments_within_same_tick(generator: &impl IdGenerator) {
    let id1 = generator.next_id().unwrap();
    let id2 = generator.next_id().unwrap();
    let id3 = generator.next_id().unwrap();

    assert_eq!(id1.timestamp(), 123);
    assert_eq!(id2.timestamp(), 123);
    assert_eq!(id3.timestamp(), 123);
    assert_eq!(id1.sequence(), 0);
    assert_eq!(id2.sequence(), 1);
    assert_eq!(id3.sequence(), 2);
    assert_eq!(id1.datacenter_id(), 1);
    assert_eq!(id1.worker_id(), 2);
    assert!(id1 < id2 && id2 < id3);
}

#[test]
fn basic_generator_sequence_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = BasicGenerator::new(identity(), &clock).unwrap();
    run_sequence_increments_within_same_tick(&generator);
}

#[test]
fn lock_generator_sequence_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    run_sequence_increments_within_same_tick(&generator);
}

#[test]
fn atomic_generator_sequence_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    run_sequence_increments_within_same_tick(&generator);
}

fn run_fills_a_millisecond_then_rolls_over(generator: &impl IdGenerator, clock: &MockClock) {
    for expected_seq in 0..=SnowflakeId::max_sequence() {
        let id = generator.try_poll_id().unwrap_ready();
        assert_eq!(id.timestamp(), 123);
        assert_eq!(id.sequence(), expected_seq);
    }

    // 4096 identifiers consumed this millisecond; the next attempt must wait.
    let yield_for = generator.try_poll_id().unwrap_pending();
    assert_eq!(yield_for, 1);

    clock.advance(1);

    let id = generator.try_poll_id().unwrap_ready();
    assert_eq!(id.timestamp(), 124);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn basic_generator_rollover_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = BasicGenerator::new(identity(), &clock).unwrap();
    run_fills_a_millisecond_then_rolls_over(&generator, &clock);
}

#[test]
fn lock_generator_rollover_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    run_fills_a_millisecond_then_rolls_over(&generator, &clock);
}

#[test]
fn atomic_generator_rollover_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    run_fills_a_millisecond_then_rolls_over(&generator, &clock);
}

fn run_blocking_next_id_rides_out_exhaustion(generator: &impl IdGenerator) {
    // The clock is frozen while the sequence space drains, so the last call
    // has to back off until the flowing reads tick the clock forward.
    let mut last = generator.next_id().unwrap();
    for _ in 0..SnowflakeId::max_sequence() {
        let id = generator.next_id().unwrap();
        assert!(id > last);
        last = id;
    }
    assert_eq!(last.sequence(), SnowflakeId::max_sequence());

    let rolled = generator.next_id().unwrap();
    assert!(rolled.timestamp() > last.timestamp());
    assert_eq!(rolled.sequence(), 0);
}

#[test]
fn basic_generator_blocks_through_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 4100);
    let generator = BasicGenerator::new(identity(), &clock).unwrap();
    run_blocking_next_id_rides_out_exhaustion(&generator);
}

#[test]
fn lock_generator_blocks_through_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 4100);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    run_blocking_next_id_rides_out_exhaustion(&generator);
}

#[test]
fn atomic_generator_blocks_through_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 4100);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    run_blocking_next_id_rides_out_exhaustion(&generator);
}

fn run_regression_fails_and_leaves_state_unchanged(
    generator: &impl IdGenerator,
    clock: &MockClock,
) {
    clock.set(TEST_EPOCH + 100);
    generator.next_id().unwrap();
    let before = generator.snapshot().unwrap();

    clock.set(TEST_EPOCH + 40);
    let err = generator.next_id().unwrap_err();
    assert!(matches!(err, Error::ClockRegression { drift_ms: 60 }));
    assert_eq!(generator.snapshot().unwrap(), before);

    // No internal retry happened; a fresh call under the same drift fails
    // identically.
    let err = generator.next_id().unwrap_err();
    assert!(matches!(err, Error::ClockRegression { drift_ms: 60 }));
    assert_eq!(generator.snapshot().unwrap(), before);

    // Once the clock catches up, generation resumes where it left off.
    clock.set(TEST_EPOCH + 200);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 200);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn basic_generator_clock_regression_test() {
    let clock = MockClock::at(TEST_EPOCH + 100);
    let generator = BasicGenerator::new(identity(), &clock).unwrap();
    run_regression_fails_and_leaves_state_unchanged(&generator, &clock);
}

#[test]
fn lock_generator_clock_regression_test() {
    let clock = MockClock::at(TEST_EPOCH + 100);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    run_regression_fails_and_leaves_state_unchanged(&generator, &clock);
}

#[test]
fn atomic_generator_clock_regression_test() {
    let clock = MockClock::at(TEST_EPOCH + 100);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    run_regression_fails_and_leaves_state_unchanged(&generator, &clock);
}

fn run_batch_is_exact_and_strictly_increasing(generator: &impl IdGenerator) {
    let ids = generator.next_batch(10_000).unwrap();
    assert_eq!(ids.len(), 10_000);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn basic_generator_batch_test() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 0);
    let generator = BasicGenerator::new(identity(), &clock).unwrap();
    run_batch_is_exact_and_strictly_increasing(&generator);
}

#[test]
fn lock_generator_batch_test() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 0);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    run_batch_is_exact_and_strictly_increasing(&generator);
}

#[test]
fn atomic_generator_batch_test() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 0);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    run_batch_is_exact_and_strictly_increasing(&generator);
}

fn run_batch_spans_an_exhausted_millisecond(generator: &impl IdGenerator) {
    let ids = generator.next_batch(10).unwrap();
    assert_eq!(ids.len(), 10);
    assert!(ids.windows(2).all(|w| w[0] < w[1]));

    // The first five drain the seeded millisecond; the rest arrive after a
    // wait, on fresh ticks with the sequence reset.
    for (i, id) in ids[..5].iter().enumerate() {
        assert_eq!(id.timestamp(), 123);
        assert_eq!(id.sequence(), 4091 + i as u64);
    }
    assert!(ids[5].timestamp() > 123);
    assert_eq!(ids[5].sequence(), 0);
}

fn seeded_near_exhaustion() -> GenerationState {
    GenerationState::new(TEST_EPOCH + 123, 4090)
}

#[test]
fn basic_generator_batch_spans_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 8);
    let generator =
        BasicGenerator::with_state(identity(), &clock, seeded_near_exhaustion()).unwrap();
    run_batch_spans_an_exhausted_millisecond(&generator);
}

#[test]
fn lock_generator_batch_spans_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 8);
    let generator =
        LockGenerator::with_state(identity(), &clock, seeded_near_exhaustion()).unwrap();
    run_batch_spans_an_exhausted_millisecond(&generator);
}

#[test]
fn atomic_generator_batch_spans_exhaustion() {
    let clock = FlowingClock::new(TEST_EPOCH + 123, 8);
    let generator =
        AtomicGenerator::with_state(identity(), &clock, seeded_near_exhaustion()).unwrap();
    run_batch_spans_an_exhausted_millisecond(&generator);
}

#[test]
fn lock_generator_batch_discards_claims_on_regression() {
    let e = TEST_EPOCH;
    let clock = ReplayClock::new(vec![e + 123, e + 123, e + 123, e + 123, e + 50]);
    let generator = LockGenerator::new(identity(), &clock).unwrap();

    let err = generator.next_batch(10).unwrap_err();
    assert!(matches!(err, Error::ClockRegression { drift_ms: 73 }));

    // The three successfully claimed identifiers were consumed but never
    // returned; the state records them so they cannot be reissued.
    let state = generator.snapshot().unwrap();
    assert_eq!(state.last_timestamp_ms, e + 123);
    assert_eq!(state.sequence, 2);
}

#[test]
fn atomic_generator_batch_discards_claims_on_regression() {
    let e = TEST_EPOCH;
    let clock = ReplayClock::new(vec![e + 123, e + 123, e + 123, e + 50]);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();

    // The first claim takes the whole millisecond, the second read still
    // sits on the exhausted tick, the third regresses.
    let err = generator.next_batch(5_000).unwrap_err();
    assert!(matches!(err, Error::ClockRegression { drift_ms: 73 }));

    let state = generator.snapshot().unwrap();
    assert_eq!(state.last_timestamp_ms, e + 123);
    assert_eq!(state.sequence, 4095);
}

fn run_wait_times_out_on_a_frozen_clock(generator: &impl IdGenerator) {
    let err = generator.next_id().unwrap_err();
    assert!(matches!(err, Error::SequenceWaitTimeout { .. }));
}

fn exhausted_state() -> GenerationState {
    GenerationState::new(TEST_EPOCH + 123, 4095)
}

fn short_wait() -> WaitPolicy {
    WaitPolicy::new(Duration::from_millis(5))
}

#[test]
fn basic_generator_wait_timeout_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = BasicGenerator::with_state(identity(), &clock, exhausted_state())
        .unwrap()
        .with_wait_policy(short_wait());
    run_wait_times_out_on_a_frozen_clock(&generator);
}

#[test]
fn lock_generator_wait_timeout_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = LockGenerator::with_state(identity(), &clock, exhausted_state())
        .unwrap()
        .with_wait_policy(short_wait());
    run_wait_times_out_on_a_frozen_clock(&generator);
}

#[test]
fn atomic_generator_wait_timeout_test() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = AtomicGenerator::with_state(identity(), &clock, exhausted_state())
        .unwrap()
        .with_wait_policy(short_wait());
    run_wait_times_out_on_a_frozen_clock(&generator);
}

#[test]
fn constructor_rejects_epoch_ahead_of_clock() {
    let clock = MockClock::at(TEST_EPOCH - 1);
    let err = BasicGenerator::new(identity(), &clock).unwrap_err();
    assert!(matches!(
        err,
        Error::EpochAheadOfClock {
            epoch_ms: TEST_EPOCH,
            ..
        }
    ));
}

#[test]
fn constructor_rejects_snapshot_before_epoch() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let state = GenerationState::new(TEST_EPOCH - 10, 0);
    let err = LockGenerator::with_state(identity(), &clock, state).unwrap_err();
    assert!(matches!(err, Error::Storage(_)));
}

#[test]
fn fresh_generator_snapshot_is_zero() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = LockGenerator::new(identity(), &clock).unwrap();
    assert_eq!(generator.snapshot().unwrap(), GenerationState::default());
}

#[test]
fn empty_batch_is_allowed() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let generator = AtomicGenerator::new(identity(), &clock).unwrap();
    assert!(generator.next_batch(0).unwrap().is_empty());
}

#[test]
fn resume_continues_after_the_persisted_state() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let store = MemoryStateStore::default();

    let generator = LockGenerator::new(identity(), &clock).unwrap();
    let mut last = generator.next_id().unwrap();
    for _ in 0..2 {
        last = generator.next_id().unwrap();
    }
    generator.snapshot().unwrap().persist(&store).unwrap();
    drop(generator);

    let resumed = LockGenerator::resume(identity(), &clock, &store).unwrap();
    let id = resumed.next_id().unwrap();
    assert!(id > last);
    assert_eq!(id.timestamp(), 123);
    assert_eq!(id.sequence(), 3);
}

#[test]
fn resume_from_an_empty_store_starts_fresh() {
    let clock = MockClock::at(TEST_EPOCH + 123);
    let store = MemoryStateStore::default();
    let generator = AtomicGenerator::resume(identity(), &clock, &store).unwrap();
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 123);
    assert_eq!(id.sequence(), 0);
}

#[test]
fn resume_with_a_future_snapshot_reports_regression_first() {
    let clock = MockClock::at(TEST_EPOCH + 1_000);
    let store = MemoryStateStore::default();
    GenerationState::new(TEST_EPOCH + 1_500, 17)
        .persist(&store)
        .unwrap();

    // Construction adopts the stale future value rather than clamping it.
    let generator = LockGenerator::resume(identity(), &clock, &store).unwrap();
    let err = generator.next_id().unwrap_err();
    assert!(matches!(err, Error::ClockRegression { drift_ms: 500 }));

    // Catching up clears the condition without losing the restored state.
    clock.set(TEST_EPOCH + 1_500);
    let id = generator.next_id().unwrap();
    assert_eq!(id.timestamp(), 1_500);
    assert_eq!(id.sequence(), 18);
}

fn run_threaded_uniqueness<G>(make_generator: impl Fn() -> G)
where
    G: IdGenerator + Send + Sync,
{
    const THREADS: usize = 4;
    const IDS_PER_THREAD: usize = 16_384;

    let generator = Arc::new(make_generator());
    let mut per_thread: Vec<Vec<SnowflakeId>> = Vec::with_capacity(THREADS);

    scope(|s| {
        let mut handles = Vec::with_capacity(THREADS);
        for _ in 0..THREADS {
            let generator = Arc::clone(&generator);
            handles.push(s.spawn(move || {
                let mut ids = Vec::with_capacity(IDS_PER_THREAD);
                for _ in 0..IDS_PER_THREAD {
                    ids.push(generator.next_id().expect("generation failed"));
                }
                ids
            }));
        }
        for handle in handles {
            per_thread.push(handle.join().unwrap());
        }
    });

    let mut seen = HashSet::with_capacity(THREADS * IDS_PER_THREAD);
    for ids in &per_thread {
        // Call order within a thread is generation order.
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        for id in ids {
            assert!(seen.insert(*id));
        }
    }
    assert_eq!(seen.len(), THREADS * IDS_PER_THREAD);
}

#[test]
fn lock_generator_threaded_uniqueness() {
    run_threaded_uniqueness(|| LockGenerator::new(identity(), SystemClock).unwrap());
}

#[test]
fn atomic_generator_threaded_uniqueness() {
    run_threaded_uniqueness(|| AtomicGenerator::new(identity(), SystemClock).unwrap());
}
