//! Defines the chrlog abstract machine.

mod backtrack;
pub mod breakpoint;
mod config;
mod err;
mod frame;
pub mod soln_stream;
mod stream;
#[cfg(test)]
mod tests;

pub use config::*;
pub use err::*;
pub use frame::*;
pub use stream::*;

pub type Res<T> = Result<T, err::Err>;
