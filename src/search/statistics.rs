//! Running-mean statistics, in a strict and a dirty lock-free flavor.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::state::Float;

/// Largest visit count the `f32` representation tracks exactly (2^24, the
/// mantissa width). Statistics saturate here and the search treats an
/// approach to this value as a termination condition.
pub const COUNT_MAX: Float = 16_777_216.0;

/// Strict single-threaded running mean.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Statistics {
    count: Float,
    mean: Float,
}

impl Statistics {
    pub fn new(mean: Float, count: Float) -> Self {
        Statistics { count, mean }
    }

    pub fn add(&mut self, x: Float) {
        if self.count >= COUNT_MAX {
            return;
        }
        self.count += 1.0;
        self.mean += (x - self.mean) / self.count;
    }

    pub fn count(&self) -> Float {
        self.count
    }

    pub fn mean(&self) -> Float {
        self.mean
    }

    pub fn clear(&mut self) {
        *self = Statistics::default();
    }
}

/// Lock-free running mean with dirty-read semantics.
///
/// Count and mean are stored as `f32` bit patterns in two relaxed atomics.
/// Writers read both, compute the new pair and store it back without any
/// synchronization, so concurrent updates can be lost and readers can
/// observe a count from one update paired with a mean from another. The
/// search tolerates this: final values only need to converge approximately,
/// and counts still only ever grow.
#[derive(Debug, Default)]
pub struct LockFreeStats {
    count: AtomicU32,
    mean: AtomicU32,
}

impl LockFreeStats {
    pub fn new(mean: Float, count: Float) -> Self {
        LockFreeStats {
            count: AtomicU32::new(count.to_bits()),
            mean: AtomicU32::new(mean.to_bits()),
        }
    }

    /// Reset to the given mean and count. Only meaningful while no other
    /// thread is updating.
    pub fn init(&self, mean: Float, count: Float) {
        self.count.store(count.to_bits(), Ordering::Relaxed);
        self.mean.store(mean.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, x: Float) {
        self.add_weighted(x, 1.0);
    }

    /// Add a value with the given weight; the count accumulates the sum of
    /// weights.
    pub fn add_weighted(&self, x: Float, weight: Float) {
        let count = self.count();
        if count >= COUNT_MAX {
            return;
        }
        let mean = self.mean();
        let new_count = count + weight;
        let new_mean = mean + (x - mean) * weight / new_count;
        self.mean.store(new_mean.to_bits(), Ordering::Relaxed);
        self.count.store(new_count.to_bits(), Ordering::Relaxed);
    }

    /// Overwrite the mean, keeping the count.
    pub(crate) fn set_mean(&self, mean: Float) {
        self.mean.store(mean.to_bits(), Ordering::Relaxed);
    }

    pub fn count(&self) -> Float {
        f32::from_bits(self.count.load(Ordering::Relaxed))
    }

    pub fn mean(&self) -> Float {
        f32::from_bits(self.mean.load(Ordering::Relaxed))
    }

    /// Strict snapshot of the current (possibly torn) pair.
    pub fn snapshot(&self) -> Statistics {
        Statistics::new(self.mean(), self.count())
    }
}
