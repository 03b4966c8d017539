use std::num::NonZeroUsize;

use rpds::Vector;
use tracing::debug;

use crate::{
    data_structures::{Map, Set, Sig, Subst, Var},
    rt::Res,
    show::Show,
    tm::RcTm,
};

use super::{ChrProgram, Cid, Guard, RuleId};

/// The constraint store of one execution branch.
///
/// Every field is a persistent map, so cloning a store to save it at a choice
/// point costs nothing and later changes on either side stay invisible to the
/// other.
#[derive(Debug, Clone, Default)]
pub struct ChrStore {
    live: Map<Sig, Set<Cid>>,
    backlinks: Map<Var, Set<Cid>>,
    /// Per rule, the serials of every combination that has already fired it,
    /// listed in head order.
    history: Map<RuleId, Set<Vec<usize>>>,
}

/// A rule that matched and whose body still has to run.
#[derive(Debug, Clone)]
pub struct Firing {
    pub rule: RuleId,
    /// The participants' arguments in head order, after any `Decon` guards have
    /// prepended theirs.
    pub env: Vec<RcTm>,
}

impl ChrStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, serial: NonZeroUsize, sig: Sig, args: Vector<RcTm>) -> Cid {
        let cid = Cid::new(serial, sig, args);
        let mut group = self.live.get(&sig).cloned().unwrap_or_default();
        group.insert_mut(cid.clone());
        self.live.insert_mut(sig, group);
        cid
    }

    pub fn connect(&mut self, var: Var, cid: Cid) {
        let mut cids = self.backlinks.get(&var).cloned().unwrap_or_default();
        cids.insert_mut(cid);
        self.backlinks.insert_mut(var, cids);
    }

    /// Detaches and returns the set of constraints mentioning `var`.
    pub fn take_backlinks(&mut self, var: &Var) -> Option<Set<Cid>> {
        let cids = self.backlinks.get(var).cloned()?;
        self.backlinks.remove_mut(var);
        Some(cids)
    }

    pub fn backlinks(&self, var: &Var) -> impl Iterator<Item = &Cid> {
        self.backlinks.get(var).into_iter().flat_map(|cids| cids.iter())
    }

    pub fn alive(&self, cid: &Cid) -> bool {
        self.live
            .get(&cid.sig())
            .map_or(false, |group| group.contains(cid))
    }

    /// Once deleted, a constraint never takes part in a match again, even though
    /// stale backlinks may still mention it.
    pub fn delete(&mut self, cid: &Cid) {
        let sig = cid.sig();
        if let Some(group) = self.live.get(&sig) {
            let mut group = group.clone();
            group.remove_mut(cid);
            self.live.insert_mut(sig, group);
        }
    }

    pub fn in_history(&self, rule: RuleId, serials: &[usize]) -> bool {
        self.history
            .get(&rule)
            .map_or(false, |fired| fired.contains(serials))
    }

    pub fn add_to_history(&mut self, rule: RuleId, serials: Vec<usize>) {
        let mut fired = self.history.get(&rule).cloned().unwrap_or_default();
        fired.insert_mut(serials);
        self.history.insert_mut(rule, fired);
    }

    /// Live constraints with signature `sig`, oldest first.
    pub fn lookup(&self, sig: &Sig) -> Vec<Cid> {
        self.live
            .get(sig)
            .map(|group| group.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every live constraint, oldest first.
    pub fn constraints(&self) -> Vec<Cid> {
        let mut all = self
            .live
            .values()
            .flat_map(|group| group.iter().cloned())
            .collect::<Vec<_>>();
        all.sort();
        all
    }

    pub fn len(&self) -> usize {
        self.live.values().map(|group| group.size()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs occurrence matching for `cid`: for each head position it could fill,
    /// tries every combination of live partners, firing the rule for each one
    /// that passes its guards and hasn't fired it before.
    ///
    /// Deletions take effect immediately, so later combinations in the same
    /// pass already see them. Bodies are *not* run here; the returned firings are
    /// in the order they matched.
    pub fn occurrences(&mut self, chrp: &ChrProgram, subs: &Subst, cid: &Cid) -> Res<Vec<Firing>> {
        let mut firings = Vec::new();

        for occ in chrp.occurrences(&cid.sig()) {
            let rule = chrp.rule(occ.rule);

            let candidates = rule
                .head
                .iter()
                .enumerate()
                .map(|(j, sig)| {
                    if j == occ.pos {
                        vec![cid.clone()]
                    } else {
                        self.lookup(sig)
                    }
                })
                .collect::<Vec<_>>();

            for combo in product(&candidates) {
                if !combo.iter().all(|c| self.alive(c)) {
                    continue;
                }

                let serials = combo.iter().map(|c| c.serial().get()).collect::<Vec<_>>();
                if has_duplicates(&serials) || self.in_history(occ.rule, &serials) {
                    continue;
                }

                let mut env = combo
                    .iter()
                    .flat_map(|c| c.args().iter().cloned())
                    .collect::<Vec<_>>();

                if !guards_hold(&rule.guards, &mut env, subs)? {
                    continue;
                }

                if tracing::enabled!(tracing::Level::DEBUG) {
                    let mut show = Show::new(subs);
                    let participants = combo.iter().map(|c| show.cid(c)).collect::<Vec<_>>();
                    debug!(
                        rule = %occ.rule,
                        pos = occ.pos,
                        propagation = rule.is_propagation(),
                        "fire {}",
                        participants.join(", ")
                    );
                }

                self.add_to_history(occ.rule, serials);
                for &d in &rule.deletes {
                    self.delete(&combo[d]);
                }

                firings.push(Firing {
                    rule: occ.rule,
                    env,
                });
            }
        }

        Ok(firings)
    }
}

fn guards_hold(guards: &[Guard], env: &mut Vec<RcTm>, subs: &Subst) -> Res<bool> {
    for guard in guards {
        if !guard.check(env, subs)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn has_duplicates(serials: &[usize]) -> bool {
    serials
        .iter()
        .enumerate()
        .any(|(i, s)| serials[..i].contains(s))
}

/// Cartesian product of `lists`, last position varying fastest.
fn product(lists: &[Vec<Cid>]) -> Vec<Vec<Cid>> {
    if lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }

    let mut combos = Vec::new();
    let mut odometer = vec![0; lists.len()];
    loop {
        combos.push(
            odometer
                .iter()
                .zip(lists)
                .map(|(&i, list)| list[i].clone())
                .collect(),
        );

        // Advance, carrying leftwards.
        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return combos;
            }
            pos -= 1;
            odometer[pos] += 1;
            if odometer[pos] < lists[pos].len() {
                break;
            }
            odometer[pos] = 0;
        }
    }
}
