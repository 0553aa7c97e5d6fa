//! UCT exploration bias with a per-selection-step log cache.

use crate::state::Float;

/// Computes `constant * sqrt(log(parent_count) / child_count)`.
///
/// `log(parent_count)` is computed once per selection step via
/// `start_iteration` and reused for every child.
#[derive(Clone, Copy, Debug)]
pub struct BiasTerm {
    constant: Float,
    log_parent_count: Float,
}

impl BiasTerm {
    pub fn new(constant: Float) -> Self {
        BiasTerm {
            constant,
            log_parent_count: 0.0,
        }
    }

    pub fn start_iteration(&mut self, parent_count: Float) {
        if self.constant != 0.0 {
            self.log_parent_count = parent_count.max(1.0).ln();
        }
    }

    /// Bias for a child with the given visit count. An unvisited child gets
    /// an infinite bias so it is selected before any visited sibling.
    pub fn get(&self, child_count: Float) -> Float {
        if self.constant == 0.0 {
            return 0.0;
        }
        if child_count == 0.0 {
            return Float::INFINITY;
        }
        self.constant * (self.log_parent_count / child_count).sqrt()
    }
}
