use super::{Res, Solution};

/// Essentially a trait alias.
pub trait SolnStream: Iterator<Item = Res<Solution>> {}

// Impl it for all T that apply.
impl<T> SolnStream for T where T: Iterator<Item = Res<Solution>> {}
