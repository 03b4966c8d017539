use std::num::NonZeroUsize;

/// Hands out serial numbers, starting at 1. Variables and constraint ids draw from
/// one of these each.
#[derive(Debug, Clone)]
pub struct Incr {
    n: NonZeroUsize,
}

impl Default for Incr {
    fn default() -> Self {
        Self {
            n: NonZeroUsize::MIN,
        }
    }
}

impl Incr {
    pub fn next(&mut self) -> NonZeroUsize {
        let old = self.n;
        self.n = old.saturating_add(1);
        old
    }

    /// How many numbers have been handed out so far.
    pub fn issued(&self) -> usize {
        self.n.get() - 1
    }
}
