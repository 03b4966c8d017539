/// How a stream orders the branches of its search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strategy {
    /// Always resume the innermost untried alternative. Solutions come out in
    /// clause order, and the fall-through branch of a `Choice` before the branch
    /// saved at its offset.
    #[default]
    DepthFirst,
    /// After each solution or failed unification, rotate the pending
    /// alternatives so the search resumes from the outermost one. Re-entering a
    /// predicate that is already running does the same. Every solution is still
    /// produced exactly once, but sibling branches interleave, which keeps left
    /// recursion from starving the rest of the tree.
    Interleaved,
}

/// Per-stream settings.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Deepest allowed nesting of predicate calls. `None` means no limit.
    pub max_depth: Option<usize>,
    pub strategy: Strategy,
}

impl Config {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }
}
