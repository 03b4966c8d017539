//! The instruction set, and the containers compiled code lives in.

use std::{collections::BTreeMap, fmt, rc::Rc};

use rpds::Vector;
use subst::Collapse;

use crate::{
    builtin::Builtin,
    data_structures::{Int, Sig, Subst, Sym},
    rt::{Err, Res},
    tm::{Functor, RcTm, Tm},
};

/// An argument expression, evaluated against a continuation's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// Register `n` of the environment.
    Ix(usize),
    /// A compound term built from sub-expressions. Collapses on construction if
    /// the functor is a builtin and every argument is ground.
    Xt(Functor, Vec<Expr>),
    Const(RcTm),
}

impl Expr {
    pub fn ix(index: usize) -> Self {
        Expr::Ix(index)
    }

    pub fn xt(functor: impl Into<Functor>, args: impl IntoIterator<Item = Expr>) -> Self {
        Expr::Xt(functor.into(), args.into_iter().collect())
    }

    pub fn builtin(b: Builtin, x: Expr, y: Expr) -> Self {
        Expr::Xt(b.into(), vec![x, y])
    }

    pub fn atom(name: impl Into<Sym>) -> Self {
        Expr::Const(RcTm::atom(name))
    }

    pub fn int(i: impl Into<Int>) -> Self {
        Expr::Const(RcTm::int(i))
    }

    pub fn txt(s: impl Into<String>) -> Self {
        Expr::Const(RcTm::txt(s))
    }

    /// `cons(x0, cons(x1, ... nil))` over expressions.
    pub fn list(items: impl IntoIterator<Item = Expr>) -> Self {
        let items = items.into_iter().collect::<Vec<_>>();
        items
            .into_iter()
            .rev()
            .fold(Expr::atom("nil"), |tail, head| Expr::xt("cons", [head, tail]))
    }

    /// Produces the fully dereferenced term this expression denotes.
    pub fn eval(&self, env: &[RcTm], subs: &Subst) -> Res<RcTm> {
        match self {
            Expr::Ix(index) => env
                .get(*index)
                .map(|tm| subs.deep_walk(tm))
                .ok_or(Err::RegisterOutOfBounds {
                    index: *index,
                    len: env.len(),
                }),
            Expr::Xt(functor, args) => {
                let args = args
                    .iter()
                    .map(|arg| arg.eval(env, subs))
                    .collect::<Res<Vector<_>>>()?;
                let tm: RcTm = Tm::Compound(*functor, args).into();
                Ok(tm.collapse().unwrap_or(tm))
            }
            Expr::Const(tm) => Ok(subs.deep_walk(tm)),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Ix(index) => write!(f, "#{index}"),
            Expr::Xt(functor, args) if args.is_empty() => write!(f, "{functor}"),
            Expr::Xt(functor, args) => {
                write!(f, "{functor}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Expr::Const(tm) => write!(f, "{tm}"),
        }
    }
}

/// Jump offsets are relative to the *following* instruction: the program counter
/// has already moved past the instruction being executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instr {
    Invoke(Sym, Vec<Expr>),
    Goto(isize),
    Choice(isize),
    Fresh(usize),
    Unify(Expr, Expr),
    Success,
    Fail,
    Constraint(Sym, Vec<Expr>),
}

fn write_call(f: &mut fmt::Formatter<'_>, name: &Sym, args: &[Expr]) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{arg}")?;
    }
    f.write_str(")")
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Invoke(name, args) => {
                f.write_str("invoke ")?;
                write_call(f, name, args)
            }
            Instr::Goto(offset) => write!(f, "goto {offset:+}"),
            Instr::Choice(offset) => write!(f, "choice {offset:+}"),
            Instr::Fresh(n) => write!(f, "fresh {n}"),
            Instr::Unify(a, b) => write!(f, "unify {a} = {b}"),
            Instr::Success => f.write_str("success"),
            Instr::Fail => f.write_str("fail"),
            Instr::Constraint(name, args) => {
                f.write_str("constraint ")?;
                write_call(f, name, args)
            }
        }
    }
}

/// A fixed block of instructions. Shared, never edited once built.
pub type Code = Rc<[Instr]>;

fn offset(len: usize) -> isize {
    isize::try_from(len).unwrap_or(isize::MAX)
}

/// Lays out one clause: `Fresh(n_locals)`, then a `Unify` of each incoming
/// argument (which `Fresh` has shifted to register `n_locals + i`) against its
/// head pattern, then `body`, then `Success`.
pub fn clause(n_locals: usize, head: impl IntoIterator<Item = Expr>, body: Vec<Instr>) -> Vec<Instr> {
    let mut code = vec![Instr::Fresh(n_locals)];
    code.extend(
        head.into_iter()
            .enumerate()
            .map(|(i, pat)| Instr::Unify(Expr::Ix(n_locals + i), pat)),
    );
    code.extend(body);
    code.push(Instr::Success);
    code
}

/// Chains alternative clauses. Every clause but the last is guarded by a
/// `Choice` whose saved alternative is the start of the next clause.
pub fn clauses(clauses: impl IntoIterator<Item = Vec<Instr>>) -> Vec<Instr> {
    let clauses = clauses.into_iter().collect::<Vec<_>>();
    let last = clauses.len().saturating_sub(1);
    let mut code = Vec::new();
    for (i, clause) in clauses.into_iter().enumerate() {
        if i < last {
            code.push(Instr::Choice(offset(clause.len())));
        }
        code.extend(clause);
    }
    code
}

/// `a ; b`, with `a` tried first. `a` must not end in `Success` if execution is
/// meant to continue after the disjunction.
pub fn disjunction(a: Vec<Instr>, b: Vec<Instr>) -> Vec<Instr> {
    let mut code = Vec::with_capacity(a.len() + b.len() + 2);
    code.push(Instr::Choice(offset(a.len() + 1)));
    code.extend(a);
    code.push(Instr::Goto(offset(b.len())));
    code.extend(b);
    code
}

/// Compiled predicates, keyed by signature.
#[derive(Debug, Clone, Default)]
pub struct Module {
    preds: BTreeMap<Sig, Code>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `code` as the definition of `name/arity`, replacing any earlier
    /// definition.
    pub fn define(&mut self, name: impl Into<Sym>, arity: usize, code: impl Into<Code>) -> &mut Self {
        self.preds.insert(Sig::new(name, arity), code.into());
        self
    }

    pub fn get(&self, sig: &Sig) -> Option<&Code> {
        self.preds.get(sig)
    }

    pub fn lookup(&self, sig: Sig) -> Res<&Code> {
        if let Some(code) = self.preds.get(&sig) {
            return Ok(code);
        }

        let known = self
            .preds
            .keys()
            .filter(|other| other.name == sig.name)
            .map(|other| other.arity)
            .collect::<Vec<_>>();

        if known.is_empty() {
            Err(Err::NoSuchPredicate(sig))
        } else {
            Err(Err::ArityMismatch {
                name: sig.name,
                found: sig.arity,
                known,
            })
        }
    }

    pub fn sigs(&self) -> impl Iterator<Item = &Sig> {
        self.preds.keys()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use pretty_assertions::assert_eq;

    use super::*;
    use Instr::*;

    #[test]
    fn clause_layout() {
        let code = clause(1, [Expr::atom("nil"), Expr::ix(0)], vec![Fail]);
        assert_eq!(
            code,
            vec![
                Fresh(1),
                Unify(Expr::Ix(1), Expr::atom("nil")),
                Unify(Expr::Ix(2), Expr::Ix(0)),
                Fail,
                Success,
            ]
        );
    }

    #[test]
    fn choice_offsets_land_on_the_next_clause() {
        let a = vec![Fresh(0), Success];
        let b = vec![Fresh(0), Fail, Success];
        let c = vec![Success];
        let code = clauses([a, b, c]);
        assert_eq!(
            code,
            vec![Choice(2), Fresh(0), Success, Choice(3), Fresh(0), Fail, Success, Success]
        );
        // A Choice at index i resumes at i + 1 + offset.
        check!(code[0 + 1 + 2] == Choice(3));
        check!(code[3 + 1 + 3] == Success);
    }

    #[test]
    fn disjunction_layout() {
        let a = vec![Fail];
        let b = vec![Fresh(2), Fail];
        assert_eq!(
            disjunction(a, b),
            vec![Choice(2), Fail, Goto(2), Fresh(2), Fail]
        );
    }

    #[test]
    fn single_clause_needs_no_choice() {
        check!(clauses([vec![Success]]) == vec![Success]);
        check!(clauses(Vec::<Vec<Instr>>::new()).is_empty());
    }

    #[test]
    fn lookup_distinguishes_missing_from_wrong_arity() {
        let mut module = Module::new();
        module.define("p", 1, vec![Success]).define("p", 3, vec![Success]);

        check!(module.lookup(Sig::new("p", 1)).is_ok());
        let_assert!(Err(Err::NoSuchPredicate(sig)) = module.lookup(Sig::new("q", 0)));
        check!(sig == Sig::new("q", 0));
        let_assert!(Err(Err::ArityMismatch { found, known, .. }) = module.lookup(Sig::new("p", 2)));
        check!(found == 2);
        check!(known == vec![1, 3]);
    }

    #[test]
    fn eval_builds_and_collapses() {
        let subs = Subst::new();
        let env = [RcTm::int(2), RcTm::atom("a")];
        let expr = Expr::xt("f", [Expr::builtin(Builtin::Mul, Expr::ix(0), Expr::int(21)), Expr::ix(1)]);
        let_assert!(Ok(tm) = expr.eval(&env, &subs));
        check!(tm.to_string() == "f(42, a)");

        let_assert!(Err(e) = Expr::ix(5).eval(&env, &subs));
        check!(e == Err::RegisterOutOfBounds { index: 5, len: 2 });
    }

    #[test]
    fn list_expr() {
        let subs = Subst::new();
        let_assert!(Ok(tm) = Expr::list([Expr::int(0), Expr::int(1)]).eval(&[], &subs));
        check!(tm.to_string() == "cons(0, cons(1, nil))");
    }
}
