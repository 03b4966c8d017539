#![deny(unused_must_use)]

//! An abstract machine for logic programs with Constraint Handling Rules.
//!
//! Programs arrive already compiled: a [`code::Module`] of predicate code and a
//! [`chr::ChrProgram`] of indexed rules. A [`rt::Stream`] runs a [`rt::Query`]
//! against them and lazily yields each [`rt::Solution`].

pub mod builtin;
pub mod chr;
pub mod code;
pub mod data_structures;
pub mod incr;
pub mod interner;
pub mod rt;
pub mod samples;
pub mod show;
pub mod tm;
