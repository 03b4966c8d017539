use std::{fmt, iter, mem, rc::Rc};

use crate::{
    chr::{ChrStore, RuleId},
    code::{Code, Instr},
    data_structures::{Sig, Subst, Var},
    incr::Incr,
    show::Show,
    tm::RcTm,
};

use super::{Err, Res};

/// A continuation's registers.
pub type Env = Rc<[RcTm]>;

/// What a continuation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Query,
    Pred(Sig),
    Rule(RuleId),
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Query => f.write_str("?-"),
            Origin::Pred(sig) => write!(f, "{sig}"),
            Origin::Rule(rule) => write!(f, "rule {rule}"),
        }
    }
}

/// A point of execution: an environment, the code being run over it, and where
/// to return once that code reaches `Success`.
///
/// The current continuation of a [`Frame`] is owned and advanced in place. Its
/// callers are shared, so saving a continuation at a choice point clones a
/// handful of pointers.
#[derive(Clone)]
pub struct Cont {
    parent: Option<Rc<Cont>>,
    origin: Origin,
    env: Env,
    code: Code,
    pc: usize,
    depth: usize,
}

impl Cont {
    pub(crate) fn new(origin: Origin, env: Env, code: Code) -> Self {
        Self {
            parent: None,
            origin,
            env,
            code,
            pc: 0,
            depth: 0,
        }
    }

    pub fn parent(&self) -> Option<&Cont> {
        self.parent.as_deref()
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn env(&self) -> &[RcTm] {
        &self.env
    }

    pub fn code(&self) -> &Code {
        &self.code
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Number of callers above this continuation.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The instruction about to run.
    pub fn current(&self) -> Option<&Instr> {
        self.code.get(self.pc)
    }

    /// `self`, then its caller, then its caller's caller...
    pub fn ancestors(&self) -> impl Iterator<Item = &Cont> {
        iter::successors(Some(self), |cont| cont.parent())
    }

    /// Is `code` being run by this continuation or any caller?
    pub(crate) fn is_active(&self, code: &Code) -> bool {
        self.ancestors().any(|cont| Rc::ptr_eq(&cont.code, code))
    }

    /// Reads the instruction at the program counter and steps past it.
    pub(crate) fn fetch(&mut self) -> Res<(Code, usize)> {
        let pc = self.pc;
        if pc >= self.code.len() {
            return Err(Err::PcOutOfBounds {
                pc,
                len: self.code.len(),
            });
        }
        self.pc += 1;
        Ok((self.code.clone(), pc))
    }

    pub(crate) fn target(&self, offset: isize) -> Res<usize> {
        self.pc
            .checked_add_signed(offset)
            .filter(|&target| target <= self.code.len())
            .ok_or(Err::JumpOutOfBounds {
                pc: self.pc,
                offset,
            })
    }

    pub(crate) fn jump(&mut self, offset: isize) -> Res<()> {
        self.pc = self.target(offset)?;
        Ok(())
    }

    pub(crate) fn resume_at(&self, pc: usize) -> Cont {
        let mut cont = self.clone();
        cont.pc = pc;
        cont
    }

    /// Prepends `n` fresh variables to the environment.
    pub(crate) fn fresh(&mut self, n: usize, vars: &mut Incr) {
        let fresh = (0..n).map(|_| RcTm::from(Var::new(vars.next())));
        self.env = fresh.chain(self.env.iter().cloned()).collect();
    }

    /// Makes a callee running `code` over `env` the current continuation, with
    /// the old current continuation as its parent.
    pub(crate) fn call(&mut self, origin: Origin, env: Env, code: Code) {
        let depth = self.depth + 1;
        let caller = mem::replace(self, Cont::new(origin, env, code));
        self.parent = Some(Rc::new(caller));
        self.depth = depth;
    }

    /// Returns to the caller. `false` if there is none, i.e. this is the query.
    pub(crate) fn ret(&mut self) -> bool {
        match self.parent.take() {
            Some(parent) => {
                *self = Rc::try_unwrap(parent).unwrap_or_else(|shared| (*shared).clone());
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for Cont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cont")
            .field("origin", &self.origin)
            .field("pc", &self.pc)
            .field("depth", &self.depth)
            .field("env", &self.env)
            .finish_non_exhaustive()
    }
}

// Long chains of callers would otherwise be dropped recursively.
impl Drop for Cont {
    fn drop(&mut self) {
        let mut parent = self.parent.take();
        while let Some(rc) = parent {
            parent = match Rc::try_unwrap(rc) {
                Ok(mut cont) => cont.parent.take(),
                Err(_) => None,
            };
        }
    }
}

/// Slot of a choice point in its stream's arena. Slots of unreachable choice
/// points are reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AltId(pub(crate) usize);

/// The complete state of one branch of the search.
#[derive(Debug, Clone)]
pub struct Frame {
    pub(crate) alt: Option<AltId>,
    pub(crate) subs: Subst,
    pub(crate) chrs: ChrStore,
    pub(crate) cont: Cont,
}

impl Frame {
    pub(crate) fn new(env: Env, code: Code) -> Self {
        Self {
            alt: None,
            subs: Subst::new(),
            chrs: ChrStore::new(),
            cont: Cont::new(Origin::Query, env, code),
        }
    }

    /// The innermost choice point this branch could backtrack into.
    pub fn alt(&self) -> Option<AltId> {
        self.alt
    }

    pub fn subs(&self) -> &Subst {
        &self.subs
    }

    pub fn chrs(&self) -> &ChrStore {
        &self.chrs
    }

    pub fn cont(&self) -> &Cont {
        &self.cont
    }
}

/// A goal together with the variables it was written over.
///
/// Each call to [`Query::var`] allocates one top-level variable and puts it in
/// the next register, so the first variable is `Ix(0)` in the goal code.
#[derive(Debug, Clone)]
pub struct Query {
    pub(crate) vars: Incr,
    pub(crate) env: Vec<RcTm>,
    pub(crate) code: Code,
}

impl Query {
    pub fn new(code: impl Into<Code>) -> Self {
        Self {
            vars: Incr::default(),
            env: Vec::new(),
            code: code.into(),
        }
    }

    pub fn var(&mut self) -> Var {
        let var = Var::new(self.vars.next());
        self.env.push(var.into());
        var
    }

    pub fn env(&self) -> &[RcTm] {
        &self.env
    }
}

/// One answer: the bindings and the constraints left standing when the query
/// succeeded.
#[derive(Debug, Clone)]
pub struct Solution {
    pub subs: Subst,
    pub chrs: ChrStore,
}

impl Solution {
    /// The fully dereferenced value of `var` in this answer.
    pub fn resolve(&self, var: Var) -> RcTm {
        self.subs.deep_walk(&var.into())
    }

    pub fn show(&self) -> Show<'_> {
        Show::new(&self.subs)
    }

    pub fn show_with<S: Into<String>>(
        &self,
        names: impl IntoIterator<Item = (Var, S)>,
    ) -> Show<'_> {
        Show::with_names(&self.subs, names)
    }
}
