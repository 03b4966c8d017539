use std::fmt;

use crate::{
    chr::RuleId,
    data_structures::{Sig, Sym},
};

/// Program errors. These mean the compiled program itself is malformed, so they
/// are never absorbed by backtracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Err {
    NoSuchPredicate(Sig),
    ArityMismatch {
        name: Sym,
        found: usize,
        /// Arities under which `name` *is* defined.
        known: Vec<usize>,
    },
    RegisterOutOfBounds {
        index: usize,
        len: usize,
    },
    PcOutOfBounds {
        pc: usize,
        len: usize,
    },
    JumpOutOfBounds {
        pc: usize,
        offset: isize,
    },
    BadDeleteIndex {
        rule: RuleId,
        index: usize,
        heads: usize,
    },
    EmptyRuleHead(RuleId),
    MaxRecursionDepthExceeded {
        depth: usize,
        sig: Sig,
    },
}

impl fmt::Display for Err {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Err::NoSuchPredicate(sig) => {
                write!(f, "No predicate exists with signature `{sig}`.")
            }
            Err::ArityMismatch { name, found, known } => {
                let known = known
                    .iter()
                    .map(|arity| format!("`{name}/{arity}`"))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "The predicate `{name}` was called with {found} arguments, \
                     but it is only defined as {known}."
                )
            }
            Err::RegisterOutOfBounds { index, len } => {
                write!(
                    f,
                    "Register {index} is out of bounds for an environment of {len} registers."
                )
            }
            Err::PcOutOfBounds { pc, len } => {
                write!(
                    f,
                    "Program counter {pc} ran off the end of a {len}-instruction block."
                )
            }
            Err::JumpOutOfBounds { pc, offset } => {
                write!(f, "Jump by {offset} from pc {pc} leaves the code block.")
            }
            Err::BadDeleteIndex { rule, index, heads } => {
                write!(
                    f,
                    "Rule {rule} deletes head {index}, but it only has {heads} heads."
                )
            }
            Err::EmptyRuleHead(rule) => {
                write!(f, "Rule {rule} has no head constraints.")
            }
            Err::MaxRecursionDepthExceeded { depth, sig } => {
                write!(
                    f,
                    "Max recursion depth ({depth}) exceeded while calling `{sig}`."
                )
            }
        }
    }
}

impl std::error::Error for Err {}
