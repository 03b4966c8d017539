use std::collections::BTreeSet;

use rpds::Vector;
use tracing::{debug, trace};

use crate::{
    chr::{ChrProgram, Cid},
    code::{Expr, Instr, Module},
    data_structures::{Sig, Var},
    incr::Incr,
    show::Show,
    tm::RcTm,
};

use super::{
    backtrack::ChoiceStack,
    breakpoint::{Breakpoint, Event},
    Config, Err, Frame, Origin, Query, Res, Solution, Strategy,
};

/// What the driver does after an instruction.
enum Next {
    Continue,
    /// Explicit `Fail`: resume the next alternative.
    Fail,
    /// Unification failed: resume the next alternative, then delay it.
    FailAndDelay,
    /// Re-entered a running predicate under [`Strategy::Interleaved`].
    Delay,
    /// The query itself reached `Success`.
    Solution(Solution),
}

/// Runs one query against a compiled program, one instruction per step.
///
/// Iterating a `Stream` yields each solution as it is found. After the last one,
/// or after a program error, the stream is finished for good. Dropping it early
/// needs no cleanup.
pub struct Stream<'p> {
    module: &'p Module,
    chrp: &'p ChrProgram,
    frame: Option<Frame>,
    alts: ChoiceStack,
    vars: Incr,
    cids: Incr,
    config: Config,
    debugger: Option<Box<dyn Breakpoint + 'p>>,
    solutions: usize,
}

impl<'p> Stream<'p> {
    pub fn new(module: &'p Module, chrp: &'p ChrProgram, query: Query) -> Self {
        let Query { vars, env, code } = query;
        Self {
            module,
            chrp,
            frame: Some(Frame::new(env.into(), code)),
            alts: ChoiceStack::default(),
            vars,
            cids: Incr::default(),
            config: Config::default(),
            debugger: None,
            solutions: 0,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn with_debugger(mut self, debugger: impl Breakpoint + 'p) -> Self {
        self.debugger = Some(Box::new(debugger));
        self
    }

    /// The state of the branch currently running, if the stream isn't finished.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.frame.is_none()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// How many alternatives the current branch could still backtrack into.
    pub fn pending(&self) -> usize {
        self.frame
            .as_ref()
            .map_or(0, |frame| self.alts.pending(frame))
    }

    /// How many choice points the stream is holding on to, including ones
    /// already taken that haven't been reclaimed yet.
    pub fn choice_points(&self) -> usize {
        self.alts.live()
    }

    /// Executes exactly one instruction. Returns the solution if that
    /// instruction was the query's own `Success`.
    pub fn step(&mut self) -> Res<Option<Solution>> {
        let Some(mut frame) = self.frame.take() else {
            return Ok(None);
        };

        let next = match self.exec(&mut frame) {
            Ok(next) => next,
            Err(e) => {
                debug!(error = %e, "program error, abandoning search");
                self.event(Event::Exception, &frame);
                return Err(e);
            }
        };

        match next {
            Next::Continue => self.frame = Some(frame),
            Next::Fail => {
                self.event(Event::Fail, &frame);
                let resumed = self.alts.fail(&frame);
                self.resume(resumed);
            }
            Next::FailAndDelay => {
                self.event(Event::Fail, &frame);
                let resumed = self.alts.fail(&frame);
                let resumed = self.alts.delay(resumed, self.config.strategy);
                self.resume(resumed);
            }
            Next::Delay => {
                self.frame = self.alts.delay(Some(frame), self.config.strategy);
                self.alts.reclaim(self.frame.as_ref());
            }
            Next::Solution(solution) => {
                self.solutions += 1;
                debug!(n = self.solutions, "solution");
                let resumed = self.alts.fail(&frame);
                let resumed = self.alts.delay(resumed, self.config.strategy);
                self.resume(resumed);
                return Ok(Some(solution));
            }
        }

        Ok(None)
    }

    fn resume(&mut self, resumed: Option<Frame>) {
        match &resumed {
            Some(frame) => {
                debug!(alt = ?frame.alt(), pc = frame.cont().pc(), "backtrack");
                self.event(Event::Redo, frame);
            }
            None => debug!(
                choice_points = self.alts.pushed(),
                vars = self.vars.issued(),
                constraints = self.cids.issued(),
                "search exhausted"
            ),
        }
        self.frame = resumed;
        self.alts.reclaim(self.frame.as_ref());
    }

    fn event(&mut self, event: Event, frame: &Frame) {
        if let Some(debugger) = self.debugger.as_mut() {
            debugger.breakpoint(event, frame);
        }
    }

    fn exec(&mut self, frame: &mut Frame) -> Res<Next> {
        let (code, pc) = frame.cont.fetch()?;
        let instr = &code[pc];
        trace!(depth = frame.cont.depth(), pc, "{instr}");

        match instr {
            Instr::Invoke(name, args) => {
                let args = eval_all(args, frame)?;
                let sig = Sig::new(*name, args.len());
                let callee = self.module.lookup(sig)?.clone();

                let depth = frame.cont.depth() + 1;
                if let Some(max) = self.config.max_depth {
                    if depth > max {
                        return Err(Err::MaxRecursionDepthExceeded { depth: max, sig });
                    }
                }

                let reentrant =
                    self.config.strategy == Strategy::Interleaved && frame.cont.is_active(&callee);

                frame.cont.call(Origin::Pred(sig), args.into(), callee);
                self.event(Event::Call, frame);

                if reentrant {
                    trace!(%sig, "re-entered, delaying");
                    return Ok(Next::Delay);
                }
            }

            Instr::Goto(offset) => frame.cont.jump(*offset)?,

            Instr::Choice(offset) => {
                let resume_pc = frame.cont.target(*offset)?;
                let resume = frame.cont.resume_at(resume_pc);
                let id = self.alts.push(frame, resume);
                debug!(alt = id.0, resume_pc, "choice point");
            }

            Instr::Fresh(n) => frame.cont.fresh(*n, &mut self.vars),

            Instr::Unify(a, b) => {
                let a = a.eval(frame.cont.env(), &frame.subs)?;
                let b = b.eval(frame.cont.env(), &frame.subs)?;

                let Some(unified) = frame.subs.unify(&a, &b) else {
                    trace!(%a, %b, "unify failed");
                    return Ok(Next::FailAndDelay);
                };

                frame.subs = unified.subst;
                self.event(Event::Unify, frame);
                self.reactivate(frame, unified.bindings)?;
            }

            Instr::Success => {
                self.event(Event::Exit, frame);
                if !frame.cont.ret() {
                    return Ok(Next::Solution(Solution {
                        subs: frame.subs.clone(),
                        chrs: frame.chrs.clone(),
                    }));
                }
            }

            Instr::Fail => return Ok(Next::Fail),

            Instr::Constraint(name, args) => {
                let args = eval_all(args, frame)?.into_iter().collect::<Vector<_>>();
                let sig = Sig::new(*name, args.len());
                let cid = frame.chrs.add(self.cids.next(), sig, args);

                for arg in cid.args().iter() {
                    for var in frame.subs.occurrences(arg) {
                        frame.chrs.connect(var, cid.clone());
                    }
                }

                if tracing::enabled!(tracing::Level::DEBUG) {
                    debug!(serial = cid.serial().get(), "constraint {}", Show::new(&frame.subs).cid(&cid));
                }

                self.fire(frame, &cid)?;
            }
        }

        Ok(Next::Continue)
    }

    /// Hands the backlinks of each newly bound variable over to the variables of
    /// its value, then re-runs matching for every live constraint involved, oldest
    /// first.
    fn reactivate(&mut self, frame: &mut Frame, bindings: Vec<(Var, RcTm)>) -> Res<()> {
        let mut affected = BTreeSet::new();

        for (var, value) in bindings {
            let Some(cids) = frame.chrs.take_backlinks(&var) else {
                continue;
            };
            let vars = frame.subs.occurrences(&value);
            for cid in cids.iter() {
                for v in &vars {
                    frame.chrs.connect(*v, cid.clone());
                }
                affected.insert(cid.clone());
            }
        }

        for cid in affected {
            if frame.chrs.alive(&cid) {
                self.fire(frame, &cid)?;
            }
        }

        Ok(())
    }

    /// Matches `cid` against the rule heads and schedules the body of every
    /// rule that fires. Bodies are pushed in firing order, so the last one to
    /// fire runs first.
    fn fire(&mut self, frame: &mut Frame, cid: &Cid) -> Res<()> {
        let chrp = self.chrp;
        let firings = frame.chrs.occurrences(chrp, &frame.subs, cid)?;

        for firing in firings {
            let body = chrp.rule(firing.rule).body.clone();
            frame
                .cont
                .call(Origin::Rule(firing.rule), firing.env.into(), body);
            self.event(Event::Fire, frame);
        }

        Ok(())
    }
}

fn eval_all(args: &[Expr], frame: &Frame) -> Res<Vec<RcTm>> {
    args.iter()
        .map(|arg| arg.eval(frame.cont.env(), &frame.subs))
        .collect()
}

impl<'p> Iterator for Stream<'p> {
    type Item = Res<Solution>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.is_done() {
            match self.step() {
                Ok(Some(solution)) => return Some(Ok(solution)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
