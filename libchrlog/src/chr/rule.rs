use std::{cmp::Ordering, collections::BTreeMap, fmt};

use crate::{
    code::{Code, Expr},
    data_structures::{Sig, Subst},
    rt::{Err, Res},
    tm::{Functor, RcTm, Tm},
};

use super::RuleId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Le,
    Ge,
    Lt,
    Gt,
}

impl CmpOp {
    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Le => ord.is_le(),
            CmpOp::Ge => ord.is_ge(),
            CmpOp::Lt => ord.is_lt(),
            CmpOp::Gt => ord.is_gt(),
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CmpOp::Le => "<=",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Gt => ">",
        })
    }
}

/// A test a candidate combination of constraints must pass before a rule fires.
/// Guards see the participants' arguments concatenated in head order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Structural equality. Distinct unbound variables are *not* equal.
    Eq(Expr, Expr),
    /// Integers compare numerically, text lexicographically. Anything else
    /// (including an unbound variable) does not satisfy the guard.
    Cmp(CmpOp, Expr, Expr),
    /// Register `ix` must hold a compound `functor/arity`. Its arguments are
    /// prepended to the environment, shifting every existing register up by
    /// `arity`.
    Decon {
        functor: Functor,
        arity: usize,
        ix: usize,
    },
}

impl Guard {
    pub fn eq(a: Expr, b: Expr) -> Self {
        Guard::Eq(a, b)
    }

    pub fn cmp(op: CmpOp, a: Expr, b: Expr) -> Self {
        Guard::Cmp(op, a, b)
    }

    pub fn decon(functor: impl Into<Functor>, arity: usize, ix: usize) -> Self {
        Guard::Decon {
            functor: functor.into(),
            arity,
            ix,
        }
    }

    pub fn check(&self, env: &mut Vec<RcTm>, subs: &Subst) -> Res<bool> {
        match self {
            Guard::Eq(a, b) => Ok(a.eval(env, subs)? == b.eval(env, subs)?),
            Guard::Cmp(op, a, b) => {
                let a = a.eval(env, subs)?;
                let b = b.eval(env, subs)?;
                let ord = match (a.as_ref(), b.as_ref()) {
                    (Tm::Int(x), Tm::Int(y)) => x.cmp(y),
                    (Tm::Txt(x), Tm::Txt(y)) => x.cmp(y),
                    _ => return Ok(false),
                };
                Ok(op.holds(ord))
            }
            Guard::Decon { functor, arity, ix } => {
                let tm = env.get(*ix).ok_or(Err::RegisterOutOfBounds {
                    index: *ix,
                    len: env.len(),
                })?;
                match subs.walk(tm).as_ref() {
                    Tm::Compound(f, args) if f == functor && args.len() == *arity => {
                        let mut extended = args.iter().cloned().collect::<Vec<_>>();
                        extended.append(env);
                        *env = extended;
                        Ok(true)
                    }
                    _ => Ok(false),
                }
            }
        }
    }
}

/// One compiled rule.
///
/// A rule that lists no `deletes` is a propagation rule. One that deletes every
/// head position is a simplification rule. Anything in between is a simpagation.
#[derive(Debug, Clone)]
pub struct Rule {
    pub head: Vec<Sig>,
    pub guards: Vec<Guard>,
    /// Runs in a fresh continuation whose environment is the guard environment.
    /// Must end in `Success`.
    pub body: Code,
    pub deletes: Vec<usize>,
}

impl Rule {
    pub fn new(
        head: impl IntoIterator<Item = Sig>,
        guards: impl IntoIterator<Item = Guard>,
        body: impl Into<Code>,
    ) -> Self {
        Self {
            head: head.into_iter().collect(),
            guards: guards.into_iter().collect(),
            body: body.into(),
            deletes: Vec::new(),
        }
    }

    pub fn deleting(mut self, deletes: impl IntoIterator<Item = usize>) -> Self {
        self.deletes = deletes.into_iter().collect();
        self.deletes.sort_unstable();
        self.deletes.dedup();
        self
    }

    pub fn is_propagation(&self) -> bool {
        self.deletes.is_empty()
    }
}

/// One head position of one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub rule: RuleId,
    pub pos: usize,
}

/// A validated rule set, indexed by the signatures appearing in rule heads.
#[derive(Debug, Clone, Default)]
pub struct ChrProgram {
    rules: Vec<Rule>,
    occ: BTreeMap<Sig, Vec<Occurrence>>,
}

impl ChrProgram {
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Res<Self> {
        let rules = rules.into_iter().collect::<Vec<_>>();
        let mut occ: BTreeMap<Sig, Vec<Occurrence>> = BTreeMap::new();

        for (i, rule) in rules.iter().enumerate() {
            let id = RuleId(i);

            if rule.head.is_empty() {
                return Err(Err::EmptyRuleHead(id));
            }

            if let Some(&index) = rule.deletes.iter().find(|&&d| d >= rule.head.len()) {
                return Err(Err::BadDeleteIndex {
                    rule: id,
                    index,
                    heads: rule.head.len(),
                });
            }

            for (pos, sig) in rule.head.iter().enumerate() {
                occ.entry(*sig)
                    .or_default()
                    .push(Occurrence { rule: id, pos });
            }
        }

        Ok(Self { rules, occ })
    }

    /// A program with no rules. Constraints are simply stored.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    /// Every head position, across all rules, that `sig` could fill. In rule
    /// order, then head order.
    pub fn occurrences(&self, sig: &Sig) -> &[Occurrence] {
        self.occ.get(sig).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use assert2::{check, let_assert};

    use super::*;
    use crate::{code::Instr, data_structures::Var};

    fn leq() -> Sig {
        Sig::new("leq", 2)
    }

    fn var(n: usize) -> RcTm {
        Var::new(NonZeroUsize::new(n).unwrap()).into()
    }

    #[test]
    fn index_lists_every_head_position() {
        let chrp = ChrProgram::new([
            Rule::new([leq()], [], vec![Instr::Success]).deleting([0]),
            Rule::new([leq(), Sig::new("gcd", 1), leq()], [], vec![Instr::Success]),
        ])
        .unwrap();

        check!(
            chrp.occurrences(&leq())
                == [
                    Occurrence { rule: RuleId(0), pos: 0 },
                    Occurrence { rule: RuleId(1), pos: 0 },
                    Occurrence { rule: RuleId(1), pos: 2 },
                ]
        );
        check!(chrp.occurrences(&Sig::new("gcd", 1)).len() == 1);
        check!(chrp.occurrences(&Sig::new("gcd", 2)).is_empty());
    }

    #[test]
    fn validation() {
        let_assert!(
            Err(Err::BadDeleteIndex { rule, index: 2, heads: 2 }) = ChrProgram::new([
                Rule::new([leq()], [], vec![Instr::Success]),
                Rule::new([leq(), leq()], [], vec![Instr::Success]).deleting([0, 2]),
            ])
        );
        check!(rule == RuleId(1));

        let_assert!(
            Err(Err::EmptyRuleHead(RuleId(0))) =
                ChrProgram::new([Rule::new([], [], vec![Instr::Success])])
        );

        let_assert!(Ok(chrp) = ChrProgram::new(Vec::new()));
        check!(chrp.is_empty());
    }

    #[test]
    fn comparison_guards() {
        let subs = Subst::new();
        let mut env = vec![RcTm::int(3), RcTm::int(10), RcTm::txt("abc"), var(1)];

        let lt = Guard::cmp(CmpOp::Lt, Expr::ix(0), Expr::ix(1));
        let ge = Guard::cmp(CmpOp::Ge, Expr::ix(0), Expr::ix(1));
        let txt = Guard::cmp(CmpOp::Le, Expr::ix(2), Expr::txt("abd"));
        let mixed = Guard::cmp(CmpOp::Le, Expr::ix(0), Expr::ix(2));
        let unbound = Guard::cmp(CmpOp::Le, Expr::ix(3), Expr::ix(3));

        check!(lt.check(&mut env, &subs) == Ok(true));
        check!(ge.check(&mut env, &subs) == Ok(false));
        check!(txt.check(&mut env, &subs) == Ok(true));
        check!(mixed.check(&mut env, &subs) == Ok(false));
        check!(unbound.check(&mut env, &subs) == Ok(false));
    }

    #[test]
    fn equality_guard_respects_functors_and_variables() {
        let subs = Subst::new();
        let mut env = vec![
            RcTm::compound("f", [RcTm::int(1)]),
            RcTm::compound("g", [RcTm::int(1)]),
            var(1),
            var(2),
        ];

        check!(Guard::eq(Expr::ix(0), Expr::ix(1)).check(&mut env, &subs) == Ok(false));
        check!(Guard::eq(Expr::ix(2), Expr::ix(3)).check(&mut env, &subs) == Ok(false));
        check!(Guard::eq(Expr::ix(2), Expr::ix(2)).check(&mut env, &subs) == Ok(true));

        let_assert!(Some(u) = subs.unify(&var(2), &var(1)));
        check!(Guard::eq(Expr::ix(2), Expr::ix(3)).check(&mut env, &u.subst) == Ok(true));
    }

    #[test]
    fn decon_prepends_arguments() {
        let subs = Subst::new();
        let pair = RcTm::compound("pair", [RcTm::int(1), RcTm::atom("b")]);
        let_assert!(Some(u) = subs.unify(&var(1), &pair));

        let mut env = vec![RcTm::atom("x"), var(1)];
        check!(Guard::decon("pair", 2, 1).check(&mut env, &u.subst) == Ok(true));
        check!(env == vec![RcTm::int(1), RcTm::atom("b"), RcTm::atom("x"), var(1)]);

        let mut env = vec![var(1)];
        check!(Guard::decon("pair", 3, 0).check(&mut env, &u.subst) == Ok(false));
        check!(env.len() == 1);

        let_assert!(
            Err(Err::RegisterOutOfBounds { index: 4, len: 1 }) =
                Guard::decon("pair", 2, 4).check(&mut env, &u.subst)
        );
    }
}
