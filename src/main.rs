#![deny(unused_must_use)]

use libchrlog::{
    chr::ChrProgram,
    code::{Expr, Instr, Instr::*, Module},
    rt::{Config, Query, Stream, Strategy},
    samples,
};
use nu_ansi_term::Color;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    app_err::{AppErr, AppRes},
    tracer::Tracer,
};

mod app_err;
mod tracer;

const USAGE: &str = "\
Usage: chrlog [OPTIONS]

Runs the bundled sample queries and prints their answers.

Options:
  --max-depth N     fail with an error once calls nest deeper than N
  --interleave      interleave sibling branches instead of searching depth first
  --limit N         stop each query after N answers (default 8)
  --trace EVENTS    print the given events (comma separated, or `all`)
  -h, --help        print this message

Set RUST_LOG=libchrlog=debug (or trace) to see the machine's own log.";

#[derive(Debug)]
struct Opts {
    config: Config,
    limit: usize,
    tracer: Option<Tracer>,
    help: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            config: Config::default(),
            limit: 8,
            tracer: None,
            help: false,
        }
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &'static str) -> AppRes<String> {
    args.next().ok_or(AppErr::MissingValue { flag })
}

fn number(args: &mut impl Iterator<Item = String>, flag: &'static str) -> AppRes<usize> {
    let value = value(args, flag)?;
    value
        .parse()
        .map_err(|_| AppErr::BadValue { flag, value })
}

fn parse_args(mut args: impl Iterator<Item = String>) -> AppRes<Opts> {
    let mut opts = Opts::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--max-depth" => {
                opts.config = opts.config.with_max_depth(number(&mut args, "--max-depth")?)
            }
            "--interleave" => opts.config = opts.config.with_strategy(Strategy::Interleaved),
            "--limit" => opts.limit = number(&mut args, "--limit")?,
            "--trace" => opts.tracer = Some(Tracer::parse(&value(&mut args, "--trace")?)?),
            "-h" | "--help" => opts.help = true,
            other => return Err(AppErr::UnknownFlag(other.to_owned())),
        }
    }

    Ok(opts)
}

struct Demo {
    goal: &'static str,
    names: &'static [&'static str],
    code: Vec<Instr>,
    chrp: ChrProgram,
}

fn demos() -> AppRes<Vec<Demo>> {
    let (a, b, c) = (Expr::ix(0), Expr::ix(1), Expr::ix(2));
    let leq = |x: &Expr, y: &Expr| Constraint("leq".into(), vec![x.clone(), y.clone()]);

    Ok(vec![
        Demo {
            goal: "append(X, Y, [0, 1])",
            names: &["X", "Y"],
            code: vec![
                Invoke(
                    "append".into(),
                    vec![a.clone(), b.clone(), Expr::list([Expr::int(0), Expr::int(1)])],
                ),
                Success,
            ],
            chrp: ChrProgram::empty(),
        },
        Demo {
            goal: "bits(A, B)",
            names: &["A", "B"],
            code: vec![Invoke("bits".into(), vec![a.clone(), b.clone()]), Success],
            chrp: ChrProgram::empty(),
        },
        Demo {
            goal: "nat(N)",
            names: &["N"],
            code: vec![Invoke("nat".into(), vec![a.clone()]), Success],
            chrp: ChrProgram::empty(),
        },
        Demo {
            goal: "leq(A, B), leq(B, A)",
            names: &["A", "B"],
            code: vec![leq(&a, &b), leq(&b, &a), Success],
            chrp: samples::leq()?,
        },
        Demo {
            goal: "leq(A, B), leq(B, C), C = d",
            names: &["A", "B", "C"],
            code: vec![leq(&a, &b), leq(&b, &c), Unify(c.clone(), Expr::atom("d")), Success],
            chrp: samples::leq()?,
        },
        Demo {
            goal: "leq(A, B), leq(B, C), leq(C, A)",
            names: &["A", "B", "C"],
            code: vec![leq(&a, &b), leq(&b, &c), leq(&c, &a), Success],
            chrp: samples::leq()?,
        },
        Demo {
            goal: "watch(X), X = 42",
            names: &["X"],
            code: vec![
                Constraint("watch".into(), vec![a.clone()]),
                Unify(a.clone(), Expr::int(42)),
                Success,
            ],
            chrp: samples::watchers()?,
        },
        Demo {
            goal: "split(pair(X, 4)), X = 3",
            names: &["X"],
            code: vec![
                Constraint("split".into(), vec![Expr::xt("pair", [a.clone(), Expr::int(4)])]),
                Unify(a, Expr::int(3)),
                Success,
            ],
            chrp: samples::watchers()?,
        },
    ])
}

fn run(module: &Module, demo: Demo, opts: &Opts) {
    info!(goal = demo.goal, strategy = ?opts.config.strategy, "running sample");
    println!("{}", Color::Cyan.bold().paint(format!("?- {}.", demo.goal)));

    let mut query = Query::new(demo.code);
    let vars = demo
        .names
        .iter()
        .map(|name| (query.var(), *name))
        .collect::<Vec<_>>();

    let mut stream = Stream::new(module, &demo.chrp, query).with_config(opts.config.clone());
    if let Some(tracer) = &opts.tracer {
        stream = stream.with_debugger(tracer.clone());
    }

    let mut count = 0;
    let mut errored = false;
    for answer in stream.by_ref().take(opts.limit) {
        let solution = match answer {
            Ok(solution) => solution,
            Err(e) => {
                println!("{}", Color::Red.paint(format!("{}", AppErr::from(e))));
                errored = true;
                break;
            }
        };
        count += 1;

        let mut show = solution.show_with(vars.iter().copied());
        let bindings = vars
            .iter()
            .map(|(var, name)| format!("{name} = {}", show.tm(&(*var).into())))
            .collect::<Vec<_>>();
        if bindings.is_empty() {
            println!("  {}", Color::Green.paint("true"));
        } else {
            println!("  {}", Color::Green.paint(bindings.join(", ")));
        }

        for cid in solution.chrs.constraints() {
            println!("    {}", Color::Purple.paint(show.cid(&cid)));
        }
    }

    if let Some((color, line)) = summary(count, errored, stream.is_done()) {
        println!("  {}", color.paint(line));
    }
    println!();
}

/// The closing line for a query, if it needs one. A program error has already
/// been reported and says enough on its own.
fn summary(count: usize, errored: bool, done: bool) -> Option<(Color, String)> {
    if errored {
        None
    } else if count == 0 {
        Some((Color::Yellow, "false".into()))
    } else if !done {
        Some((Color::DarkGray, format!("# stopped after {count} answers")))
    } else {
        None
    }
}

fn main() {
    human_panic::setup_panic!();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = match parse_args(std::env::args().skip(1)) {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("{}", Color::Red.paint(format!("{e}")));
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    };

    if opts.help {
        println!("{USAGE}");
        return;
    }

    let demos = match demos() {
        Ok(demos) => demos,
        Err(e) => {
            eprintln!("{}", Color::Red.paint(format!("{e}")));
            std::process::exit(1);
        }
    };

    let module = samples::module();
    info!(preds = ?module.sigs().collect::<Vec<_>>(), "loaded sample module");
    for demo in demos {
        run(&module, demo, &opts);
    }
}
