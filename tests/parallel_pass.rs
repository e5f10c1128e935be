//! Integration tests for the multithreaded coefficient pass.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fdtd_operator::prelude::*;
use fdtd_operator::OperatorError;

/// Deterministic analytic coefficient source. Pure function of its
/// arguments, so the parallel pass must reproduce the sequential reference
/// bit for bit.
struct AnalyticSource;

impl CoefficientSource for AnalyticSource {
    fn coefficients(&self, axis: usize, pos: [usize; 3]) -> [f64; 4] {
        let x = pos[0] as f64;
        let y = pos[1] as f64;
        let z = pos[2] as f64;
        let a = (axis + 1) as f64;
        [
            a * (x + 2.0 * y + 4.0 * z).sin(),
            a * (x * y + z + 1.0).ln(),
            a + x * 0.125 + y * 0.25 + z * 0.5,
            a * (x - y) * (z + 0.5),
        ]
    }
}

/// Source that counts how many cells were evaluated.
struct CountingSource {
    calls: AtomicUsize,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

impl CoefficientSource for CountingSource {
    fn coefficients(&self, _axis: usize, pos: [usize; 3]) -> [f64; 4] {
        self.calls.fetch_add(1, Ordering::Relaxed);
        [pos[0] as f64, pos[1] as f64, pos[2] as f64, 1.0]
    }
}

/// Parallel pass output is bit-identical to the sequential reference, for
/// every axis, position, and coefficient kind.
#[test]
fn test_parallel_matches_sequential() {
    let grid = GridDescriptor::new([33, 17, 9]).unwrap();

    let mut reference = CoefficientTables::new(&grid);
    compute_sequential(&grid, &AnalyticSource, &mut reference);

    for workers in [1, 2, 4, 7] {
        let mut op = MultithreadOperator::new(grid);
        op.set_source(Arc::new(AnalyticSource));
        op.set_worker_count(workers);
        op.setup().unwrap();

        assert_eq!(
            op.tables(),
            &reference,
            "parallel pass diverged with {workers} workers"
        );
    }
}

/// Scenario: grid 4x2x2 with 2 workers. The partitioner yields lines [0,1]
/// and [2,3], and the C table for axis 0 holds the reference value at
/// position (3,1,1).
#[test]
fn test_two_worker_scenario() {
    let grid = GridDescriptor::new([4, 2, 2]).unwrap();

    let ranges = partition_lines(4, 2);
    assert_eq!(
        ranges,
        vec![LineRange { start: 0, end: 2 }, LineRange { start: 2, end: 4 }]
    );

    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(2);
    op.setup().unwrap();
    assert_eq!(op.active_workers(), 2);

    let ipos = grid.index([3, 1, 1]);
    let expected = AnalyticSource.coefficients(0, [3, 1, 1]);
    assert_eq!(op.tables().ec_c[0][ipos], expected[0]);
}

/// Every cell is evaluated exactly once per axis, even when the line count
/// does not divide evenly among the workers.
#[test]
fn test_each_cell_computed_once_per_axis() {
    let grid = GridDescriptor::new([5, 3, 2]).unwrap();
    let source = Arc::new(CountingSource::new());

    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::clone(&source) as Arc<dyn CoefficientSource>);
    op.set_worker_count(3);
    op.setup().unwrap();

    assert_eq!(
        source.calls.load(Ordering::Relaxed),
        FIELD_COMPONENTS * grid.total_cells()
    );
}

/// A pass without a bound coefficient source fails with a configuration
/// error, leaves the tables untouched, and keeps the generation consumable
/// by a later, corrected call.
#[test]
fn test_missing_source_is_recoverable() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_worker_count(2);
    op.setup_generation().unwrap();

    let err = op.run_pass().unwrap_err();
    assert!(matches!(err, OperatorError::Config(_)));
    assert!(op.tables().is_zeroed());

    // Bind the source and consume the same generation.
    op.set_source(Arc::new(AnalyticSource));
    op.run_pass().unwrap();
    assert!(!op.tables().is_zeroed());
}

/// A second pass against a spent generation is rejected with a protocol
/// error instead of blocking forever on the stop barrier.
#[test]
fn test_double_pass_rejected() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(2);

    op.setup_generation().unwrap();
    op.run_pass().unwrap();

    let err = op.run_pass().unwrap_err();
    assert!(matches!(err, OperatorError::Protocol(_)));
}

/// A pass with no generation set up at all is likewise a protocol error.
#[test]
fn test_pass_without_generation_rejected() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));

    let err = op.run_pass().unwrap_err();
    assert!(matches!(err, OperatorError::Protocol(_)));
}

/// Generations can be cycled: setup, teardown, setup again, without leaking
/// workers or reusing a released barrier pair.
#[test]
fn test_generation_cycling() {
    let grid = GridDescriptor::new([12, 4, 4]).unwrap();

    let mut reference = CoefficientTables::new(&grid);
    compute_sequential(&grid, &AnalyticSource, &mut reference);

    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(3);

    for _ in 0..3 {
        op.setup_generation().unwrap();
        op.run_pass().unwrap();
        assert_eq!(op.tables(), &reference);
        op.teardown();
        assert_eq!(op.active_workers(), 0);
    }
}

/// Tearing down an armed generation whose pass never ran unparks and joins
/// its workers without running the sweep.
#[test]
fn test_teardown_of_unused_generation() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(4);

    op.setup_generation().unwrap();
    assert_eq!(op.active_workers(), 4);

    op.teardown();
    assert_eq!(op.active_workers(), 0);
    assert!(op.tables().is_zeroed());

    // The operator is still usable afterwards.
    op.setup().unwrap();
    assert!(!op.tables().is_zeroed());
}

/// Dropping an operator with a parked generation must not hang or leave
/// detached workers computing.
#[test]
fn test_drop_with_parked_generation() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(2);
    op.setup_generation().unwrap();
    drop(op);
}

/// An automatic worker count resolves to at least one worker.
#[test]
fn test_auto_worker_count() {
    let grid = GridDescriptor::new([8, 4, 4]).unwrap();
    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(0);

    op.setup_generation().unwrap();
    assert!(op.active_workers() >= 1);
    op.run_pass().unwrap();
}

/// More workers than grid lines still produces a correct pass; surplus
/// workers simply sweep empty ranges.
#[test]
fn test_more_workers_than_lines() {
    let grid = GridDescriptor::new([2, 3, 3]).unwrap();

    let mut reference = CoefficientTables::new(&grid);
    compute_sequential(&grid, &AnalyticSource, &mut reference);

    let mut op = MultithreadOperator::new(grid);
    op.set_source(Arc::new(AnalyticSource));
    op.set_worker_count(5);
    op.setup().unwrap();

    assert_eq!(op.tables(), &reference);
}
