//! Batched dispatch of sample points to the ray-integral engine.
//!
//! Points are queued in a fixed-capacity `SampleBatch`. Flushing sends the
//! whole batch (padding included) to the engine, keeps the results which
//! correspond to real points, and appends them to an accumulator which the
//! caller empties with `drain`. Whatever the pattern of internal or explicit
//! flushes, `drain` returns exactly one result per scheduled point, in
//! scheduling order.

pub mod buffer;
pub use buffer::SampleBatch;

use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;

use crate::engine::{EngineError, RayIntegralEngine, OUTPUT_COLUMNS};
use crate::sample::{RayIntegral, SamplePoint};

/// What `schedule` does when the batch is already full
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhenFull {
    /// Hand the point back: the caller must `flush` and retry
    Reject,
    /// Flush, then accept the point
    #[default]
    Flush,
}

/// Successful outcomes of `schedule`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scheduled {
    Queued,
    QueuedAfterFlush,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("sample batch is full (capacity {capacity}): flush before scheduling more points")]
    BufferFull { point: SamplePoint, capacity: usize },

    #[error("sample batch capacity must be at least 1")]
    ZeroCapacity,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Running totals over the lifetime of a dispatcher
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub engine_calls: usize,
    pub points_scheduled: usize,
    pub results_produced: usize,
    /// Wall-clock time spent inside the engine
    pub engine_time: Duration,
}

/// Owns a sample batch and the engine which processes it. One per projector:
/// neither may be shared between concurrently running projectors.
pub struct Dispatcher<E> {
    batch: SampleBatch,
    engine: E,
    when_full: WhenFull,
    results: Vec<RayIntegral>,
    stats: DispatchStats,
    warned_rejection: bool,
}

impl<E: RayIntegralEngine> Dispatcher<E> {

    pub fn new(engine: E, capacity: usize, voxel_size: [f32; 3], when_full: WhenFull) -> Result<Self, DispatchError> {
        Ok(Self {
            batch: SampleBatch::new(capacity, voxel_size)?,
            engine,
            when_full,
            results: Vec::new(),
            stats: DispatchStats::default(),
            warned_rejection: false,
        })
    }

    pub fn capacity(&self) -> usize         { self.batch.capacity() }
    pub fn pending (&self) -> usize         { self.batch.len() }
    pub fn stats   (&self) -> DispatchStats { self.stats }

    #[cfg(test)]
    fn engine(&self) -> &E { &self.engine }

    pub fn schedule(&mut self, point: SamplePoint) -> Result<Scheduled, DispatchError> {
        let point = match self.batch.push(point) {
            Ok(()) => {
                self.stats.points_scheduled += 1;
                return Ok(Scheduled::Queued)
            }
            Err(point) => point,
        };
        match self.when_full {
            WhenFull::Reject => Err(DispatchError::BufferFull { point, capacity: self.capacity() }),
            WhenFull::Flush  => {
                self.flush()?;
                // Cannot fail: the batch has just been emptied
                if let Err(point) = self.batch.push(point) {
                    return Err(DispatchError::BufferFull { point, capacity: self.capacity() })
                }
                self.stats.points_scheduled += 1;
                Ok(Scheduled::QueuedAfterFlush)
            }
        }
    }

    /// Schedule all `points`, flushing whenever the batch rejects one, whatever
    /// the `WhenFull` policy. The first rejection is logged as a warning.
    pub fn schedule_all(&mut self, points: impl IntoIterator<Item = SamplePoint>) -> Result<(), DispatchError> {
        for point in points {
            match self.schedule(point) {
                Ok(_) => {},
                Err(DispatchError::BufferFull { point, capacity }) => {
                    if !self.warned_rejection {
                        tracing::warn!(capacity, "sample batch rejected a point: flushing and retrying");
                        self.warned_rejection = true;
                    }
                    self.flush()?;
                    self.schedule(point)?;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Send the batch to the engine. The results belonging to real points are
    /// appended to those awaiting `drain`, and are also returned here.
    ///
    /// If the engine fails, or answers a real point with unusable voxel
    /// coordinates, the batch and all undrained results are discarded.
    pub fn flush(&mut self) -> Result<&[RayIntegral], DispatchError> {
        let n_valid = self.batch.len();
        let start = self.results.len();
        if n_valid == 0 { return Ok(&self.results[start..]) }

        let capacity = self.batch.capacity();
        self.stats.engine_calls += 1;
        let t0 = Instant::now();
        let outcome = self.engine.integrate(&self.batch.engine_input());
        self.stats.engine_time += t0.elapsed();
        self.batch.reset();

        let output = match outcome {
            Ok(output) if output.dim() == (capacity, OUTPUT_COLUMNS) => output,
            Ok(output) => {
                self.results.clear();
                return Err(EngineError::MalformedOutput {
                    expected: (capacity, OUTPUT_COLUMNS),
                    got: output.dim(),
                }.into())
            }
            Err(e) => {
                self.results.clear();
                return Err(e.into())
            }
        };

        // Rows beyond `n_valid` answer the padding
        let fresh = output.rows().into_iter()
            .take(n_valid)
            .enumerate()
            .map(|(slot, row)| {
                let row = [row[0], row[1], row[2], row[3]];
                RayIntegral::from_engine_row(row).ok_or(EngineError::BadVoxel { slot, row })
            })
            .collect::<Result<Vec<_>, _>>();
        match fresh {
            Ok(fresh) => self.results.extend(fresh),
            Err(e) => {
                self.results.clear();
                return Err(e.into())
            }
        }
        self.stats.results_produced += n_valid;
        tracing::debug!(n_valid, capacity, "flushed sample batch");
        Ok(&self.results[start..])
    }

    /// Forget pending points and undrained results without contacting the
    /// engine.
    pub fn discard(&mut self) {
        self.batch.reset();
        self.results.clear();
    }

    /// Flush any pending points, and hand over every result produced since the
    /// previous drain. Does not contact the engine if nothing is pending.
    pub fn drain(&mut self) -> Result<Vec<RayIntegral>, DispatchError> {
        if !self.batch.is_empty() { self.flush()?; }
        Ok(std::mem::take(&mut self.results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineInput, EngineError};
    use crate::types::{Point, Vector};
    use ndarray::Array2;
    use rstest::rstest;
    #[allow(unused)] use pretty_assertions::{assert_eq, assert_ne};

    /// Answers each slot with its own norm const as weight and position as
    /// voxel, so results can be traced back to the points.
    #[derive(Default)]
    struct EchoEngine {
        batches: Vec<Array2<f32>>,
    }

    impl RayIntegralEngine for EchoEngine {
        fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
            let mut out = Array2::zeros((input.capacity(), OUTPUT_COLUMNS));
            for i in 0..input.capacity() {
                out[(i, 0)] = input.norm_consts[i];
                for d in 0..3 { out[(i, d + 1)] = input.positions[(i, d)]; }
            }
            self.batches.push(input.positions.to_owned());
            Ok(out)
        }
    }

    /// Returns one row too few
    struct ShortEngine;
    impl RayIntegralEngine for ShortEngine {
        fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
            Ok(Array2::zeros((input.capacity() - 1, OUTPUT_COLUMNS)))
        }
    }

    /// Echoes, but gives the point in `slot` a NaN voxel
    struct NanVoxelEngine { slot: usize }
    impl RayIntegralEngine for NanVoxelEngine {
        fn integrate(&mut self, input: &EngineInput) -> Result<Array2<f32>, EngineError> {
            let mut out = EchoEngine::default().integrate(input)?;
            out[(self.slot, 2)] = f32::NAN;
            Ok(out)
        }
    }

    struct FaultyEngine;
    impl RayIntegralEngine for FaultyEngine {
        fn integrate(&mut self, _: &EngineInput) -> Result<Array2<f32>, EngineError> {
            Err(EngineError::Fault("device lost".into()))
        }
    }

    fn p(i: usize) -> SamplePoint {
        SamplePoint::new(Point::new(i as f32, 0.0, 0.0), Vector::new(1.0, 0.0, 0.0), 1.0)
    }

    fn echo(capacity: usize, when_full: WhenFull) -> Dispatcher<EchoEngine> {
        Dispatcher::new(EchoEngine::default(), capacity, [1.0; 3], when_full).unwrap()
    }

    fn ids(results: &[RayIntegral]) -> Vec<i32> { results.iter().map(|r| r.voxel[0]).collect() }

    #[rstest(k, case(0), case(1), case(3), case(7), case(8))]
    fn up_to_capacity_points_come_back_in_order(k: usize) {
        let mut d = echo(8, WhenFull::Reject);
        for i in 1..=k { assert_eq!(d.schedule(p(i)).unwrap(), Scheduled::Queued); }
        let results = d.drain().unwrap();
        assert_eq!(ids(&results), (1..=k as i32).collect::<Vec<_>>());
        assert_eq!(d.stats().engine_calls, usize::from(k > 0));
    }

    #[test]
    fn capacity_four_three_points_one_padding_slot() {
        let mut d = echo(4, WhenFull::Reject);
        for i in 1..=3 { d.schedule(p(i)).unwrap(); }
        let results = d.drain().unwrap();
        // One batch of 4 slots reached the engine: 3 points + zero padding
        let batches = &d.engine().batches;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].dim(), (4, 3));
        assert_eq!(batches[0].column(0).to_vec(), vec![1.0, 2.0, 3.0, 0.0]);
        // The padding's answer was discarded
        assert_eq!(ids(&results), vec![1, 2, 3]);
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn second_drain_is_empty_and_silent() {
        let mut d = echo(4, WhenFull::Reject);
        d.schedule(p(1)).unwrap();
        assert_eq!(d.drain().unwrap().len(), 1);
        assert_eq!(d.drain().unwrap().len(), 0);
        assert_eq!(d.stats().engine_calls, 1);
    }

    #[test]
    fn draining_untouched_buffer_never_calls_engine() {
        let mut d = echo(4, WhenFull::Flush);
        assert!(d.drain().unwrap().is_empty());
        assert!(d.flush().unwrap().is_empty());
        assert_eq!(d.stats().engine_calls, 0);
        assert!(d.engine().batches.is_empty());
    }

    #[test]
    fn overfilling_triggers_exactly_one_flush() {
        let capacity = 5;
        let mut d = echo(capacity, WhenFull::Flush);
        for i in 1..=capacity { assert_eq!(d.schedule(p(i)).unwrap(), Scheduled::Queued); }
        assert_eq!(d.stats().engine_calls, 0);
        assert_eq!(d.schedule(p(capacity + 1)).unwrap(), Scheduled::QueuedAfterFlush);
        assert_eq!(d.stats().engine_calls, 1);
        assert_eq!(d.pending(), 1);
        let results = d.drain().unwrap();
        assert_eq!(ids(&results), (1..=capacity as i32 + 1).collect::<Vec<_>>());
        assert_eq!(d.stats().engine_calls, 2);
    }

    #[test]
    fn rejected_point_is_handed_back_and_can_be_retried() {
        let mut d = echo(2, WhenFull::Reject);
        d.schedule(p(1)).unwrap();
        d.schedule(p(2)).unwrap();
        let point = match d.schedule(p(3)) {
            Err(DispatchError::BufferFull { point, capacity: 2 }) => point,
            other => panic!("expected BufferFull, got {other:?}"),
        };
        assert_eq!(point, p(3));
        assert_eq!(d.stats().engine_calls, 0);
        assert_eq!(ids(d.flush().unwrap()), vec![1, 2]);
        assert_eq!(d.schedule(point).unwrap(), Scheduled::Queued);
        assert_eq!(ids(&d.drain().unwrap()), vec![1, 2, 3]);
    }

    #[rstest(when_full, case(WhenFull::Reject), case(WhenFull::Flush))]
    fn schedule_all_works_under_either_policy(when_full: WhenFull) {
        let mut d = echo(3, when_full);
        d.schedule_all((1..=10).map(p)).unwrap();
        assert_eq!(ids(&d.drain().unwrap()), (1..=10).collect::<Vec<_>>());
        assert_eq!(d.stats().engine_calls, 4);
        assert_eq!(d.stats().points_scheduled, 10);
        assert_eq!(d.stats().results_produced, 10);
    }

    #[test]
    fn malformed_engine_output_is_fatal_and_leaves_nothing_behind() {
        let mut d = Dispatcher::new(ShortEngine, 4, [1.0; 3], WhenFull::Reject).unwrap();
        d.schedule(p(1)).unwrap();
        match d.drain() {
            Err(DispatchError::Engine(EngineError::MalformedOutput { expected: (4, 4), got: (3, 4) })) => {},
            other => panic!("expected MalformedOutput, got {other:?}"),
        }
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn nan_voxel_in_a_real_slot_is_fatal() {
        let mut d = Dispatcher::new(NanVoxelEngine { slot: 1 }, 4, [1.0; 3], WhenFull::Flush).unwrap();
        for i in 1..=3 { d.schedule(p(i)).unwrap(); }
        match d.drain() {
            Err(DispatchError::Engine(EngineError::BadVoxel { slot: 1, row })) => assert!(row[2].is_nan()),
            other => panic!("expected BadVoxel, got {other:?}"),
        }
        assert_eq!(d.pending(), 0);
        assert!(d.drain().unwrap().is_empty());
    }

    #[test]
    fn nan_voxel_in_padding_is_ignored() {
        let mut d = Dispatcher::new(NanVoxelEngine { slot: 3 }, 4, [1.0; 3], WhenFull::Flush).unwrap();
        for i in 1..=3 { d.schedule(p(i)).unwrap(); }
        assert_eq!(ids(&d.drain().unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn flush_returns_only_the_new_results() {
        let mut d = echo(2, WhenFull::Reject);
        d.schedule(p(1)).unwrap();
        d.schedule(p(2)).unwrap();
        assert_eq!(ids(d.flush().unwrap()), vec![1, 2]);
        d.schedule(p(3)).unwrap();
        assert_eq!(ids(d.flush().unwrap()), vec![3]);
        // Nothing pending: empty tail, no engine call
        assert!(d.flush().unwrap().is_empty());
        assert_eq!(d.stats().engine_calls, 2);
        assert_eq!(ids(&d.drain().unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn discarded_points_never_reach_the_engine() {
        let mut d = echo(2, WhenFull::Flush);
        for i in 1..=3 { d.schedule(p(i)).unwrap(); }
        d.discard();
        assert_eq!(d.pending(), 0);
        d.schedule(p(4)).unwrap();
        assert_eq!(ids(&d.drain().unwrap()), vec![4]);
        assert_eq!(d.stats().engine_calls, 2);
    }

    #[test]
    fn zero_capacity_is_an_error() {
        let outcome = Dispatcher::new(EchoEngine::default(), 0, [1.0; 3], WhenFull::Flush);
        assert!(matches!(outcome, Err(DispatchError::ZeroCapacity)));
    }

    #[test]
    fn engine_fault_discards_undrained_results() {
        let mut d = Dispatcher::new(FaultyEngine, 1, [1.0; 3], WhenFull::Flush).unwrap();
        d.schedule(p(1)).unwrap();
        assert!(matches!(d.schedule(p(2)), Err(DispatchError::Engine(EngineError::Fault(_)))));
        assert_eq!(d.pending(), 0);
    }

    use proptest::prelude::*;
    proptest! {
        // Arbitrary bursts of scheduling, each optionally followed by an
        // explicit flush, lose and duplicate nothing
        #[test]
        fn no_loss_no_duplication(
            capacity in 1..10_usize,
            bursts in proptest::collection::vec((0..25_usize, any::<bool>()), 0..8),
        ) {
            let mut d = echo(capacity, WhenFull::Flush);
            let mut next = 0;
            for (n, flush) in bursts {
                for _ in 0..n { next += 1; d.schedule(p(next)).unwrap(); }
                if flush { d.flush().unwrap(); }
            }
            let results = d.drain().unwrap();
            prop_assert_eq!(ids(&results), (1..=next as i32).collect::<Vec<_>>());
        }
    }
}
