use std::{fmt, iter, ops::Deref, rc::Rc};

use rpds::Vector;
use subst::{ClassifyTerm, Collapse, DirectChildren, TermKind};

use crate::{
    builtin::Builtin,
    data_structures::{Int, Sym, Var},
    show,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Functor {
    Named(Sym),
    Builtin(Builtin),
}

impl From<Sym> for Functor {
    fn from(sym: Sym) -> Self {
        Functor::Named(sym)
    }
}

impl From<&str> for Functor {
    fn from(s: &str) -> Self {
        Functor::Named(s.into())
    }
}

impl From<Builtin> for Functor {
    fn from(b: Builtin) -> Self {
        Functor::Builtin(b)
    }
}

impl fmt::Display for Functor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Functor::Named(name) => write!(f, "{name}"),
            Functor::Builtin(b) => write!(f, "{b}"),
        }
    }
}

/// A term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tm {
    Var(Var),
    Int(Int),
    Txt(String),
    Compound(Functor, Vector<RcTm>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RcTm(Rc<Tm>);

impl RcTm {
    pub fn int(i: impl Into<Int>) -> Self {
        Tm::Int(i.into()).into()
    }

    pub fn txt(s: impl Into<String>) -> Self {
        Tm::Txt(s.into()).into()
    }

    pub fn atom(name: impl Into<Sym>) -> Self {
        Self::compound(name, iter::empty())
    }

    pub fn compound(functor: impl Into<Sym>, args: impl IntoIterator<Item = RcTm>) -> Self {
        Tm::Compound(Functor::Named(functor.into()), args.into_iter().collect()).into()
    }

    /// Builds `cons(x0, cons(x1, ... nil))`.
    pub fn list_from_iter(it: impl DoubleEndedIterator<Item = RcTm>) -> Self {
        let mut list = Self::atom("nil");
        for element in it.rev() {
            list = Self::compound("cons", [element, list]);
        }
        list
    }

    pub fn try_as_var(&self) -> Option<Var> {
        match self.as_ref() {
            Tm::Var(v) => Some(*v),
            _ => None,
        }
    }

    /// True when no variable occurs anywhere in the term. Bindings are *not*
    /// consulted; deep-walk first if that matters.
    pub fn is_ground(&self) -> bool {
        match self.as_ref() {
            Tm::Var(_) => false,
            Tm::Int(_) | Tm::Txt(_) => true,
            Tm::Compound(_, args) => args.iter().all(RcTm::is_ground),
        }
    }
}

impl AsRef<Tm> for RcTm {
    fn as_ref(&self) -> &Tm {
        self.0.as_ref()
    }
}

impl Deref for RcTm {
    type Target = Tm;

    fn deref(&self) -> &Self::Target {
        self.as_ref()
    }
}

impl From<Tm> for RcTm {
    fn from(tm: Tm) -> Self {
        RcTm(Rc::new(tm))
    }
}

impl From<Var> for RcTm {
    fn from(var: Var) -> Self {
        Tm::Var(var).into()
    }
}

impl fmt::Display for RcTm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        show::write_tm(f, self, &mut |var| var.to_string())
    }
}

impl ClassifyTerm<Var> for RcTm {
    fn classify_term(&self) -> TermKind<&Var> {
        match self.as_ref() {
            Tm::Var(var) => TermKind::Var(var),
            _ => TermKind::NonVar,
        }
    }

    fn superficially_unifiable(&self, other: &Self) -> bool {
        match (self.as_ref(), other.as_ref()) {
            (Tm::Int(a), Tm::Int(b)) => a == b,
            (Tm::Txt(a), Tm::Txt(b)) => a == b,
            (Tm::Compound(f, xs), Tm::Compound(g, ys)) => f == g && xs.len() == ys.len(),
            _ => false,
        }
    }
}

impl DirectChildren<Var> for RcTm {
    fn direct_children<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self> + 'a> {
        match self.as_ref() {
            Tm::Var(_) | Tm::Int(_) | Tm::Txt(_) => Box::new(iter::empty()),
            Tm::Compound(_, args) => Box::new(args.iter()),
        }
    }

    fn map_direct_children(&self, f: impl FnMut(&Self) -> Self) -> Self {
        match self.as_ref() {
            Tm::Var(_) | Tm::Int(_) | Tm::Txt(_) => self.clone(),
            Tm::Compound(functor, args) => Tm::Compound(*functor, args.iter().map(f).collect()).into(),
        }
    }
}

impl Collapse for RcTm {
    fn collapse(&self) -> Option<Self> {
        match self.as_ref() {
            Tm::Compound(Functor::Builtin(b), args) if args.iter().all(RcTm::is_ground) => {
                let args = args.iter().cloned().collect::<Vec<_>>();
                b.eval(&args)
            }
            _ => None,
        }
    }
}
