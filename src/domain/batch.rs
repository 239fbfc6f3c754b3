use std::num::NonZeroUsize;

/// Batch boundaries over an ordered commit sequence of one branch.
///
/// Positions are 1-based. A position is a boundary when it is a multiple of
/// the batch size or when it is the last commit; both conditions landing on
/// the same position still yield a single boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    total: usize,
    batch_size: NonZeroUsize,
}

impl BatchPlan {
    pub fn new(total: usize, batch_size: NonZeroUsize) -> Self {
        BatchPlan { total, batch_size }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Whether an intermediate push happens at `position`
    pub fn is_boundary(&self, position: usize) -> bool {
        position > 0
            && position <= self.total
            && (position % self.batch_size.get() == 0 || position == self.total)
    }

    /// Number of intermediate pushes: `ceil(total / batch_size)`
    pub fn push_count(&self) -> usize {
        self.total.div_ceil(self.batch_size.get())
    }

    /// All boundary positions in increasing order
    pub fn boundaries(&self) -> Vec<usize> {
        (1..=self.total).filter(|&p| self.is_boundary(p)).collect()
    }
}
