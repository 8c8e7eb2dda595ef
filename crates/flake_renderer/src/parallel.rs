//! Fork-join task splitting.
//!
//! Divides a run of N assignments into contiguous ranges, one per worker,
//! and runs a range operation on each of them concurrently using a rayon
//! scope. Every call blocks until all ranges are done.

use std::ops::{Range, RangeInclusive};

/// Splits assignment ranges across the available worker threads.
///
/// The runner holds no state besides its parallelism, so one instance can
/// be reused for every frame. It is not meant to be driven from several
/// threads at once; callers serialize their runs.
#[derive(Debug, Clone, Copy)]
pub struct ParallelRunner {
    parallelism: usize,
}

impl ParallelRunner {
    /// Create a runner sized to rayon's thread count.
    pub fn new() -> Self {
        Self::with_parallelism(rayon::current_num_threads())
    }

    /// Create a runner that splits work into at most `parallelism` ranges.
    pub fn with_parallelism(parallelism: usize) -> Self {
        Self {
            parallelism: parallelism.max(1),
        }
    }

    /// Maximum number of ranges dispatched per run.
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Partition `[0, total)` into the inclusive ranges `run` dispatches.
    ///
    /// Ranges are contiguous, non-overlapping and non-empty. Zero assignments
    /// produce no ranges.
    pub fn split(&self, total: u32) -> Vec<RangeInclusive<u32>> {
        self.split_len(total as usize)
            .into_iter()
            .map(|range| range.start as u32..=(range.end - 1) as u32)
            .collect()
    }

    /// Run `op(start, end)` on every range of `[0, total)` concurrently.
    ///
    /// `end` is inclusive. Returns once every range has completed; a panic in
    /// any range is resumed on the calling thread after the others finish.
    pub fn run<F>(&self, total: u32, op: F)
    where
        F: Fn(u32, u32) + Sync,
    {
        let ranges = self.split(total);
        if ranges.is_empty() {
            return;
        }

        let op = &op;
        rayon::scope(|s| {
            for range in ranges {
                let (start, end) = range.into_inner();
                s.spawn(move |_| op(start, end));
            }
        });
    }

    /// Run `op(start, chunk)` on disjoint sub-slices of `data` concurrently.
    ///
    /// The slice is split with the same partition as `run`; `start` is the
    /// index of `chunk[0]` within `data`. Each worker owns its chunk
    /// exclusively, so no further synchronization is needed.
    pub fn run_on_slice<T, F>(&self, data: &mut [T], op: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Sync,
    {
        let ranges = self.split_len(data.len());
        if ranges.is_empty() {
            return;
        }

        let op = &op;
        rayon::scope(|s| {
            let mut rest = data;
            for range in ranges {
                let (chunk, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
                rest = tail;
                s.spawn(move |_| op(range.start, chunk));
            }
        });
    }

    fn split_len(&self, total: usize) -> Vec<Range<usize>> {
        if total == 0 {
            return Vec::new();
        }

        let tasks = self.parallelism.min(total);
        let per_task = total.div_ceil(tasks);

        (0..tasks)
            .filter_map(|task| {
                let start = task * per_task;
                let end = ((task + 1) * per_task).min(total);
                // Clamping can leave the trailing tasks with nothing to do
                (start < end).then_some(start..end)
            })
            .collect()
    }
}

impl Default for ParallelRunner {
    fn default() -> Self {
        Self::new()
    }
}
