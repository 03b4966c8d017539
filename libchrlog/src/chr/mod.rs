//! Constraint Handling Rules: compiled rule sets and the per-branch constraint
//! store they fire against.

mod rule;
mod store;

use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
    num::NonZeroUsize,
    rc::Rc,
};

use rpds::Vector;

pub use rule::*;
pub use store::*;

use crate::{data_structures::Sig, tm::RcTm};

/// Identifies a compiled rule within its [`ChrProgram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub(crate) usize);

impl RuleId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct CidData {
    serial: NonZeroUsize,
    sig: Sig,
    args: Vector<RcTm>,
}

/// A constraint instance. Two `Cid`s are the same constraint only if they came
/// from the same `Constraint` instruction execution, even when their names and
/// arguments agree; identity is the serial number.
#[derive(Debug, Clone)]
pub struct Cid(Rc<CidData>);

impl Cid {
    pub fn new(serial: NonZeroUsize, sig: Sig, args: Vector<RcTm>) -> Self {
        Cid(Rc::new(CidData { serial, sig, args }))
    }

    pub fn serial(&self) -> NonZeroUsize {
        self.0.serial
    }

    pub fn sig(&self) -> Sig {
        self.0.sig
    }

    pub fn args(&self) -> &Vector<RcTm> {
        &self.0.args
    }
}

impl PartialEq for Cid {
    fn eq(&self, other: &Self) -> bool {
        self.serial() == other.serial()
    }
}

impl Eq for Cid {}

impl PartialOrd for Cid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.serial().cmp(&other.serial())
    }
}

impl Hash for Cid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.serial().hash(state);
    }
}

/// Raw form, arguments shown without consulting any substitution. See
/// [`crate::show::Show::cid`] for the resolved form.
impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sig().name)?;
        if self.args().is_empty() {
            return Ok(());
        }
        f.write_str("(")?;
        for (i, arg) in self.args().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str(")")
    }
}
