//! Small hand-compiled programs, laid out the way the front-end compiler emits
//! them.

use crate::{
    builtin::Builtin,
    chr::{ChrProgram, CmpOp, Guard, Rule},
    code::{clause, clauses, Expr, Instr, Module},
    data_structures::Sig,
    rt::Res,
};

use Instr::*;

/// ```text
/// append(nil, X, X).
/// append(cons(H, T), L2, cons(H, L3)) :- append(T, L2, L3).
///
/// bit(0).
/// bit(1).
/// bits(A, B) :- bit(A), bit(B).
///
/// nat(z).
/// nat(s(N)) :- nat(N).
/// ```
pub fn module() -> Module {
    let mut module = Module::new();

    module.define(
        "append",
        3,
        clauses([
            clause(1, [Expr::atom("nil"), Expr::ix(0), Expr::ix(0)], vec![]),
            // H = 0, T = 1, L2 = 2, L3 = 3
            clause(
                4,
                [
                    Expr::xt("cons", [Expr::ix(0), Expr::ix(1)]),
                    Expr::ix(2),
                    Expr::xt("cons", [Expr::ix(0), Expr::ix(3)]),
                ],
                vec![Invoke("append".into(), vec![Expr::ix(1), Expr::ix(2), Expr::ix(3)])],
            ),
        ]),
    );

    module.define(
        "bit",
        1,
        clauses([
            clause(0, [Expr::int(0)], vec![]),
            clause(0, [Expr::int(1)], vec![]),
        ]),
    );

    module.define(
        "bits",
        2,
        clause(
            0,
            [],
            vec![
                Invoke("bit".into(), vec![Expr::ix(0)]),
                Invoke("bit".into(), vec![Expr::ix(1)]),
            ],
        ),
    );

    module.define(
        "nat",
        1,
        clauses([
            clause(0, [Expr::atom("z")], vec![]),
            clause(
                1,
                [Expr::xt("s", [Expr::ix(0)])],
                vec![Invoke("nat".into(), vec![Expr::ix(0)])],
            ),
        ]),
    );

    module
}

/// Partial order constraints over `leq/2`:
///
/// ```text
/// reflexivity  @ leq(X, X) <=> true.
/// antisymmetry @ leq(X, Y), leq(Y, X) <=> X = Y.
/// transitivity @ leq(X, Y), leq(Y, Z) ==> leq(X, Z).
/// idempotence  @ leq(X, Y) \ leq(X, Y) <=> true.
/// ```
pub fn leq() -> Res<ChrProgram> {
    let leq = Sig::new("leq", 2);
    ChrProgram::new([
        Rule::new([leq], [Guard::eq(Expr::ix(0), Expr::ix(1))], vec![Success]).deleting([0]),
        Rule::new(
            [leq, leq],
            [
                Guard::eq(Expr::ix(1), Expr::ix(2)),
                Guard::eq(Expr::ix(0), Expr::ix(3)),
            ],
            vec![Unify(Expr::ix(0), Expr::ix(1)), Success],
        )
        .deleting([0, 1]),
        Rule::new(
            [leq, leq],
            [Guard::eq(Expr::ix(1), Expr::ix(2))],
            vec![
                Constraint("leq".into(), vec![Expr::ix(0), Expr::ix(3)]),
                Success,
            ],
        ),
        Rule::new(
            [leq, leq],
            [
                Guard::eq(Expr::ix(0), Expr::ix(2)),
                Guard::eq(Expr::ix(1), Expr::ix(3)),
            ],
            vec![Success],
        )
        .deleting([1]),
    ])
}

/// Rules whose guards wait on their arguments:
///
/// ```text
/// watch(X) <=> X > 10 | big(X).
/// split(P) <=> P = pair(A, B) | sum(A + B).
/// ```
pub fn watchers() -> Res<ChrProgram> {
    ChrProgram::new([
        Rule::new(
            [Sig::new("watch", 1)],
            [Guard::cmp(CmpOp::Gt, Expr::ix(0), Expr::int(10))],
            vec![Constraint("big".into(), vec![Expr::ix(0)]), Success],
        )
        .deleting([0]),
        Rule::new(
            [Sig::new("split", 1)],
            [Guard::decon("pair", 2, 0)],
            vec![
                Constraint(
                    "sum".into(),
                    vec![Expr::builtin(Builtin::Add, Expr::ix(0), Expr::ix(1))],
                ),
                Success,
            ],
        )
        .deleting([0]),
    ])
}
