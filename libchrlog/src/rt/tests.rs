use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use assert2::{check, let_assert};
use insta::assert_snapshot;
use pretty_assertions::assert_eq;

use crate::{
    chr::ChrProgram,
    code::{self, Expr, Instr::*, Module},
    data_structures::{Sig, Var},
    rt::{
        backtrack::SWEEP_SLACK,
        breakpoint::{Breakpoint, Event},
        soln_stream::SolnStream,
        Config, Err, Frame, Origin, Query, Solution, Strategy, Stream,
    },
    samples,
};

fn show_vars(solution: &Solution, vars: &[(Var, &str)]) -> String {
    let mut show = solution.show_with(vars.iter().copied());
    vars.iter()
        .map(|(var, name)| format!("{name} = {}", show.tm(&(*var).into())))
        .collect::<Vec<_>>()
        .join(", ")
}

fn show_store(solution: &Solution, vars: &[(Var, &str)]) -> Vec<String> {
    let mut show = solution.show_with(vars.iter().copied());
    solution
        .chrs
        .constraints()
        .iter()
        .map(|cid| show.cid(cid))
        .collect()
}

fn solutions(stream: impl SolnStream) -> Vec<Solution> {
    stream
        .map(|solution| {
            let_assert!(Ok(solution) = solution);
            solution
        })
        .collect()
}

#[derive(Clone, Default)]
struct Recorder(Rc<RefCell<Vec<Event>>>);

impl Breakpoint for Recorder {
    fn breakpoint(&mut self, event: Event, _frame: &Frame) {
        self.0.borrow_mut().push(event);
    }
}

impl Recorder {
    fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }
}

fn append_query() -> (Query, Var, Var) {
    let mut query = Query::new(vec![
        Invoke(
            "append".into(),
            vec![
                Expr::ix(0),
                Expr::ix(1),
                Expr::list([Expr::int(0), Expr::int(1)]),
            ],
        ),
        Success,
    ]);
    let x = query.var();
    let y = query.var();
    (query, x, y)
}

#[test]
fn append_splits_a_list_three_ways() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let (query, x, y) = append_query();

    let answers = solutions(Stream::new(&module, &chrp, query))
        .iter()
        .map(|solution| show_vars(solution, &[(x, "X"), (y, "Y")]))
        .collect::<Vec<_>>();

    assert_snapshot!(answers.join("\n"), @r"
    X = nil, Y = cons(0, cons(1, nil))
    X = cons(0, nil), Y = cons(1, nil)
    X = cons(0, cons(1, nil)), Y = nil
    ");
}

#[test]
fn append_under_interleaving_finds_the_same_answers() {
    let module = samples::module();
    let chrp = ChrProgram::empty();

    let run = |strategy| {
        let (query, x, y) = append_query();
        Stream::new(&module, &chrp, query)
            .with_config(Config::default().with_strategy(strategy))
            .map(|solution| {
                let_assert!(Ok(solution) = solution);
                show_vars(&solution, &[(x, "X"), (y, "Y")])
            })
            .collect::<Vec<_>>()
    };

    assert_eq!(run(Strategy::Interleaved), run(Strategy::DepthFirst));
}

fn bits(strategy: Strategy) -> Vec<String> {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let mut query = Query::new(vec![Invoke("bits".into(), vec![Expr::ix(0), Expr::ix(1)]), Success]);
    let a = query.var();
    let b = query.var();

    Stream::new(&module, &chrp, query)
        .with_config(Config::default().with_strategy(strategy))
        .map(|solution| {
            let_assert!(Ok(solution) = solution);
            show_vars(&solution, &[(a, "A"), (b, "B")])
        })
        .collect()
}

#[test]
fn depth_first_order_follows_clause_order() {
    assert_eq!(
        bits(Strategy::DepthFirst),
        vec![
            "A = 0, B = 0",
            "A = 0, B = 1",
            "A = 1, B = 0",
            "A = 1, B = 1",
        ]
    );
}

#[test]
fn interleaving_produces_every_solution_exactly_once() {
    let answers = bits(Strategy::Interleaved);
    check!(answers.len() == 4);

    let distinct = answers.iter().cloned().collect::<BTreeSet<_>>();
    let expected = bits(Strategy::DepthFirst)
        .into_iter()
        .collect::<BTreeSet<_>>();
    check!(distinct == expected);

    // And the order is still deterministic.
    check!(bits(Strategy::Interleaved) == answers);
}

#[test]
fn rerunning_a_query_gives_the_same_sequence() {
    check!(bits(Strategy::DepthFirst) == bits(Strategy::DepthFirst));

    let module = samples::module();
    let chrp = ChrProgram::empty();
    let first = Stream::new(&module, &chrp, append_query().0).count();
    let second = Stream::new(&module, &chrp, append_query().0).count();
    check!(first == 3);
    check!(second == 3);
}

#[test]
fn consumers_may_stop_early() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let mut query = Query::new(vec![Invoke("nat".into(), vec![Expr::ix(0)]), Success]);
    let n = query.var();

    let answers = Stream::new(&module, &chrp, query)
        .take(4)
        .map(|solution| {
            let_assert!(Ok(solution) = solution);
            show_vars(&solution, &[(n, "N")])
        })
        .collect::<Vec<_>>();

    assert_eq!(
        answers,
        vec!["N = z", "N = s(z)", "N = s(s(z))", "N = s(s(s(z)))"]
    );
}

#[test]
fn long_streams_do_not_hoard_choice_points() {
    let module = samples::module();
    let chrp = ChrProgram::empty();

    for strategy in [Strategy::DepthFirst, Strategy::Interleaved] {
        let mut query = Query::new(vec![Invoke("nat".into(), vec![Expr::ix(0)]), Success]);
        query.var();
        let mut stream = Stream::new(&module, &chrp, query)
            .with_config(Config::default().with_strategy(strategy));

        let mut most = 0;
        for _ in 0..1000 {
            let_assert!(Some(Ok(_)) = stream.next());
            most = most.max(stream.choice_points());
        }

        // Each answer abandons one choice point; they must not pile up.
        check!(most < 2 * SWEEP_SLACK, "{strategy:?}");
        check!(stream.pending() <= 1, "{strategy:?}");
    }
}

#[test]
fn interleaving_escapes_a_left_recursive_clause() {
    // loop(X) :- loop(X).
    // loop(a).
    let mut module = Module::new();
    module.define(
        "loop",
        1,
        code::clauses([
            code::clause(0, [Expr::ix(0)], vec![Invoke("loop".into(), vec![Expr::ix(0)])]),
            code::clause(0, [Expr::atom("a")], vec![]),
        ]),
    );
    let chrp = ChrProgram::empty();
    let query = || {
        let mut query = Query::new(vec![Invoke("loop".into(), vec![Expr::ix(0)]), Success]);
        let x = query.var();
        (query, x)
    };

    // Depth first never leaves the first clause.
    let (q, _) = query();
    let mut stream =
        Stream::new(&module, &chrp, q).with_config(Config::default().with_max_depth(50));
    let_assert!(Some(Err(Err::MaxRecursionDepthExceeded { depth: 50, .. })) = stream.next());

    let (q, x) = query();
    let config = Config::default()
        .with_strategy(Strategy::Interleaved)
        .with_max_depth(50);
    let answers = Stream::new(&module, &chrp, q)
        .with_config(config)
        .take(3)
        .map(|solution| {
            let_assert!(Ok(solution) = solution);
            show_vars(&solution, &[(x, "X")])
        })
        .collect::<Vec<_>>();

    assert_eq!(answers, vec!["X = a", "X = a", "X = a"]);
}

#[test]
fn depth_limit_is_a_program_error() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let mut query = Query::new(vec![Invoke("nat".into(), vec![Expr::ix(0)]), Success]);
    query.var();

    let mut stream =
        Stream::new(&module, &chrp, query).with_config(Config::default().with_max_depth(3));

    for _ in 0..3 {
        let_assert!(Some(Ok(_)) = stream.next());
    }
    let_assert!(Some(Err(e)) = stream.next());
    check!(
        e == Err::MaxRecursionDepthExceeded {
            depth: 3,
            sig: Sig::new("nat", 1)
        }
    );
    check!(stream.next().is_none());
}

#[test]
fn antisymmetry_unifies_and_empties_the_store() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::leq());
    let mut query = Query::new(vec![
        Constraint("leq".into(), vec![Expr::ix(0), Expr::ix(1)]),
        Constraint("leq".into(), vec![Expr::ix(1), Expr::ix(0)]),
        Success,
    ]);
    let a = query.var();
    let b = query.var();

    let recorder = Recorder::default();
    let solutions = Stream::new(&module, &chrp, query)
        .with_debugger(recorder.clone())
        .collect::<Vec<_>>();

    let_assert!([Ok(solution)] = &solutions[..]);
    check!(solution.resolve(a) == solution.resolve(b));
    check!(solution.chrs.is_empty());
    check!(recorder.events() == vec![Event::Fire, Event::Unify, Event::Exit, Event::Exit]);
}

#[test]
fn transitivity_propagates_once() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::leq());
    let mut query = Query::new(vec![
        Constraint("leq".into(), vec![Expr::ix(0), Expr::ix(1)]),
        Constraint("leq".into(), vec![Expr::ix(1), Expr::ix(2)]),
        Unify(Expr::ix(2), Expr::atom("d")),
        Success,
    ]);
    let a = query.var();
    let b = query.var();
    let c = query.var();

    let solutions = Stream::new(&module, &chrp, query).collect::<Vec<_>>();
    let_assert!([Ok(solution)] = &solutions[..]);

    // Binding `C` re-ran matching for both constraints mentioning it, but the
    // propagation history kept transitivity from firing again.
    assert_eq!(
        show_store(solution, &[(a, "A"), (b, "B"), (c, "C")]),
        vec!["leq(A, B)", "leq(B, d)", "leq(A, d)"]
    );
}

#[test]
fn a_cycle_of_leq_collapses() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::leq());
    let mut query = Query::new(vec![
        Constraint("leq".into(), vec![Expr::ix(0), Expr::ix(1)]),
        Constraint("leq".into(), vec![Expr::ix(1), Expr::ix(2)]),
        Constraint("leq".into(), vec![Expr::ix(2), Expr::ix(0)]),
        Success,
    ]);
    let a = query.var();
    let b = query.var();
    let c = query.var();

    let solutions = Stream::new(&module, &chrp, query).collect::<Vec<_>>();
    let_assert!([Ok(solution)] = &solutions[..]);
    check!(solution.chrs.is_empty());
    check!(solution.resolve(a) == solution.resolve(b));
    check!(solution.resolve(b) == solution.resolve(c));
}

#[test]
fn guard_waits_for_its_argument() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::watchers());
    let mut query = Query::new(vec![
        Constraint("watch".into(), vec![Expr::ix(0)]),
        Unify(Expr::ix(0), Expr::int(42)),
        Success,
    ]);
    let x = query.var();
    let watch = Sig::new("watch", 1);

    let mut stream = Stream::new(&module, &chrp, query);

    // `X > 10` can't be decided while `X` is unbound.
    let_assert!(Ok(None) = stream.step());
    let_assert!(Some(frame) = stream.frame());
    check!(frame.chrs().lookup(&watch).len() == 1);
    check!(frame.cont().origin() == Origin::Query);

    // The binding reactivates `watch(X)`, which fires right away.
    let_assert!(Ok(None) = stream.step());
    let_assert!(Some(frame) = stream.frame());
    check!(frame.chrs().lookup(&watch).is_empty());
    let_assert!(Origin::Rule(rule) = frame.cont().origin());
    check!(rule.index() == 0);

    let solutions = stream.collect::<Vec<_>>();
    let_assert!([Ok(solution)] = &solutions[..]);
    check!(show_store(solution, &[(x, "X")]) == vec!["big(42)"]);
}

#[test]
fn unsatisfied_guard_leaves_the_constraint_alone() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::watchers());
    let mut query = Query::new(vec![
        Constraint("watch".into(), vec![Expr::ix(0)]),
        Unify(Expr::ix(0), Expr::int(5)),
        Success,
    ]);
    let x = query.var();

    let solutions = Stream::new(&module, &chrp, query).collect::<Vec<_>>();
    let_assert!([Ok(solution)] = &solutions[..]);
    check!(show_store(solution, &[(x, "X")]) == vec!["watch(5)"]);
}

#[test]
fn decon_guard_feeds_the_body() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::watchers());
    let mut query = Query::new(vec![
        Constraint(
            "split".into(),
            vec![Expr::xt("pair", [Expr::ix(0), Expr::int(4)])],
        ),
        Unify(Expr::ix(0), Expr::int(3)),
        Success,
    ]);
    let x = query.var();

    let solutions = Stream::new(&module, &chrp, query).collect::<Vec<_>>();
    let_assert!([Ok(solution)] = &solutions[..]);
    // `sum(X + 4)` was stored while `X` was unbound and is shown evaluated now.
    check!(show_store(solution, &[(x, "X")]) == vec!["sum(7)"]);
}

#[test]
fn constraints_are_undone_on_backtracking() {
    let module = Module::new();
    let_assert!(Ok(chrp) = samples::watchers());
    let code = [
        code::disjunction(
            vec![Constraint("watch".into(), vec![Expr::int(1)])],
            vec![Constraint("watch".into(), vec![Expr::int(2)])],
        ),
        vec![Success],
    ]
    .concat();

    let stores = Stream::new(&module, &chrp, Query::new(code))
        .map(|solution| {
            let_assert!(Ok(solution) = solution);
            show_store(&solution, &[])
        })
        .collect::<Vec<_>>();

    assert_eq!(stores, vec![vec!["watch(1)"], vec!["watch(2)"]]);
}

#[test]
fn unknown_predicate_is_not_absorbed_by_backtracking() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let code = [
        code::disjunction(vec![Invoke("nope".into(), vec![])], vec![]),
        vec![Success],
    ]
    .concat();

    let recorder = Recorder::default();
    let mut stream = Stream::new(&module, &chrp, Query::new(code)).with_debugger(recorder.clone());

    let_assert!(Some(Err(Err::NoSuchPredicate(sig))) = stream.next());
    check!(sig == Sig::new("nope", 0));
    // The untried alternative is abandoned along with the rest of the search.
    check!(stream.next().is_none());
    check!(recorder.events() == vec![Event::Exception]);
}

#[test]
fn wrong_arity_names_the_known_ones() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let query = Query::new(vec![Invoke("append".into(), vec![Expr::int(1)]), Success]);

    let errors = Stream::new(&module, &chrp, query).collect::<Vec<_>>();
    let_assert!([Err(e)] = &errors[..]);
    assert_snapshot!(
        e.to_string(),
        @"The predicate `append` was called with 1 arguments, but it is only defined as `append/3`."
    );
}

#[test]
fn byrd_box_events_for_a_disjunction() {
    let module = Module::new();
    let chrp = ChrProgram::empty();
    let code = [
        code::disjunction(
            vec![Unify(Expr::ix(0), Expr::atom("a"))],
            vec![Unify(Expr::ix(0), Expr::atom("b"))],
        ),
        vec![Success],
    ]
    .concat();
    let mut query = Query::new(code);
    query.var();

    let recorder = Recorder::default();
    let count = Stream::new(&module, &chrp, query)
        .with_debugger(recorder.clone())
        .count();

    check!(count == 2);
    check!(
        recorder.events()
            == vec![
                Event::Unify,
                Event::Exit,
                Event::Redo,
                Event::Unify,
                Event::Exit,
            ]
    );
}

#[test]
fn failed_unification_reports_fail_then_redo() {
    let module = samples::module();
    let chrp = ChrProgram::empty();
    let mut query = Query::new(vec![
        Invoke("bit".into(), vec![Expr::ix(0)]),
        Unify(Expr::ix(0), Expr::int(1)),
        Success,
    ]);
    let x = query.var();

    let recorder = Recorder::default();
    let solutions = Stream::new(&module, &chrp, query)
        .with_debugger(recorder.clone())
        .collect::<Vec<_>>();

    let_assert!([Ok(solution)] = &solutions[..]);
    check!(show_vars(solution, &[(x, "X")]) == "X = 1");
    assert_eq!(
        recorder.events(),
        vec![
            // bit(X), first clause: X = 0
            Event::Call,
            Event::Unify,
            Event::Exit,
            // X = 1 fails
            Event::Fail,
            // second clause: X = 1
            Event::Redo,
            Event::Unify,
            Event::Exit,
            Event::Unify,
            Event::Exit,
        ]
    );
}
