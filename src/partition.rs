//! Line partitioning for the worker pool.
//!
//! The outer grid axis is split into contiguous, non-overlapping line ranges,
//! one per worker. Range size is `round(total / workers)` for every worker
//! but the last; the last worker always extends to the final line, absorbing
//! the rounding remainder. Disjointness of the ranges is what makes the
//! lock-free shared-table writes of a pass safe, so it is guaranteed here
//! structurally rather than re-checked at the worker level.

/// A contiguous range of axis-0 grid lines assigned to one worker.
///
/// Half-open: covers `start..end`. A range may be empty when there are more
/// workers than lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    /// First line of the range.
    pub start: usize,
    /// One past the last line of the range.
    pub end: usize,
}

impl LineRange {
    /// Number of lines in the range.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range contains no lines.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Iterator over the line indices of the range.
    pub fn lines(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.start, self.end - 1)
        }
    }
}

/// Split `total` grid lines into `workers` disjoint ranges.
///
/// The ranges are pairwise disjoint and their union is exactly
/// `0..total`. `total` and `workers` must both be at least 1; a worker
/// count of 0 has to be resolved to hardware concurrency by the caller
/// before partitioning.
pub fn partition_lines(total: usize, workers: usize) -> Vec<LineRange> {
    debug_assert!(total >= 1, "cannot partition an empty grid axis");
    debug_assert!(workers >= 1, "worker count must be resolved before partitioning");

    let lines_per_worker = (total as f64 / workers as f64).round() as usize;

    let mut ranges = Vec::with_capacity(workers);
    for n in 0..workers {
        let start = (n * lines_per_worker).min(total);
        let end = if n == workers - 1 {
            // Last worker absorbs the rounding remainder.
            total
        } else {
            ((n + 1) * lines_per_worker).min(total)
        };
        ranges.push(LineRange { start, end });
    }

    debug_assert!(is_partition(&ranges, total));
    ranges
}

/// Check that `ranges` are pairwise disjoint, in order, and cover `0..total`.
fn is_partition(ranges: &[LineRange], total: usize) -> bool {
    let mut next = 0;
    for range in ranges {
        if range.start > range.end {
            return false;
        }
        if !range.is_empty() && range.start != next {
            return false;
        }
        next = next.max(range.end);
    }
    next == total
}
