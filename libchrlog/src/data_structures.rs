use std::{fmt, num::NonZeroUsize};

use num::BigInt;
use rpds::{RedBlackTreeMap, RedBlackTreeSet};

use crate::{interner::IStr, tm::RcTm};

pub type Sym = IStr;
pub type Int = BigInt;
pub type Map<K, V> = RedBlackTreeMap<K, V>;
pub type Set<T> = RedBlackTreeSet<T>;

pub type Subst = subst::Subst<Var, RcTm>;

/// A logic variable. Nothing but an identity: whether it is bound, and to what,
/// is entirely up to whichever [`Subst`] is consulted.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(NonZeroUsize);

impl Var {
    pub(crate) fn new(id: NonZeroUsize) -> Self {
        Self(id)
    }

    pub fn id(&self) -> usize {
        self.0.get()
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "_{}", self.0)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Var({})", self)
    }
}

/// A predicate or constraint signature: name and arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sig {
    pub name: Sym,
    pub arity: usize,
}

impl Sig {
    pub fn new(name: impl Into<Sym>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Sig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}
