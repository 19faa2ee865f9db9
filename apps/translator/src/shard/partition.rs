//! Balanced contiguous partitioning of a work list across workers
//!
//! Worker `i` of `W` gets `items[start..end]` with
//! `start = i * base + min(i, remainder)`, where `base = N / W` and
//! `remainder = N % W`. The first `remainder` workers get one extra item.

use crate::error::TranslatorError;
use std::ops::Range;

/// A validated `(worker_count, worker_index)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardAssignment {
    worker_count: usize,
    worker_index: usize,
}

impl ShardAssignment {
    /// Create an assignment, rejecting a zero worker count or an index
    /// outside `0..worker_count`
    pub fn new(worker_count: usize, worker_index: usize) -> Result<Self, TranslatorError> {
        if worker_count == 0 || worker_index >= worker_count {
            return Err(TranslatorError::InvalidShard {
                worker_count,
                worker_index,
            });
        }

        Ok(Self {
            worker_count,
            worker_index,
        })
    }

    /// The single-worker assignment (worker 0 of 1)
    pub fn solo() -> Self {
        Self {
            worker_count: 1,
            worker_index: 0,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn worker_index(&self) -> usize {
        self.worker_index
    }

    /// Index range of this worker's shard within a list of `len` items
    pub fn range(&self, len: usize) -> Range<usize> {
        let base = len / self.worker_count;
        let remainder = len % self.worker_count;
        let i = self.worker_index;

        let start = i * base + i.min(remainder);
        let end = start + base + usize::from(i < remainder);
        start..end
    }

    /// This worker's shard of `items`, in original order
    pub fn select<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        &items[self.range(items.len())]
    }
}

/// Return the contiguous sub-slice of `items` owned by `worker_index`
///
/// Fails with [`TranslatorError::InvalidShard`] when `worker_count` is zero
/// or `worker_index >= worker_count`. An empty `items` yields an empty
/// slice for every valid worker.
pub fn partition<T>(
    items: &[T],
    worker_count: usize,
    worker_index: usize,
) -> Result<&[T], TranslatorError> {
    Ok(ShardAssignment::new(worker_count, worker_index)?.select(items))
}
