//! The choice-point arena and the two operations that walk it.

use std::mem;

use tracing::debug;

use super::{AltId, Cont, Frame, Strategy};

/// How many choice points may pile up beyond twice the number that survived
/// the last sweep.
pub(crate) const SWEEP_SLACK: usize = 64;

/// A choice point. `frame` holds the untried alternative, or nothing once it has
/// been taken.
#[derive(Debug, Default)]
struct Alt {
    prev: Option<AltId>,
    frame: Option<Frame>,
}

/// The choice points of one stream, addressed by [`AltId`].
///
/// A choice point whose alternative has been taken is skipped rather than
/// removed, since other frames may still link through it.
/// [`ChoiceStack::reclaim`] frees the slots no frame can reach any more.
#[derive(Debug, Default)]
pub(crate) struct ChoiceStack {
    alts: Vec<Alt>,
    free: Vec<usize>,
    pushed: usize,
    survivors: usize,
}

impl ChoiceStack {
    /// Saves `resume` (with the frame's current bindings and constraints) as an
    /// alternative, and makes the new choice point the top of `frame`'s stack.
    pub fn push(&mut self, frame: &mut Frame, resume: Cont) -> AltId {
        let id = AltId(self.free.pop().unwrap_or(self.alts.len()));
        let saved = Frame {
            alt: Some(id),
            subs: frame.subs.clone(),
            chrs: frame.chrs.clone(),
            cont: resume,
        };
        let alt = Alt {
            prev: frame.alt,
            frame: Some(saved),
        };

        if id.0 == self.alts.len() {
            self.alts.push(alt);
        } else {
            self.alts[id.0] = alt;
        }

        self.pushed += 1;
        frame.alt = Some(id);
        id
    }

    /// Takes the innermost untried alternative reachable from `frame`. `None`
    /// means the search is exhausted.
    pub fn fail(&mut self, frame: &Frame) -> Option<Frame> {
        let mut cursor = frame.alt;
        while let Some(id) = cursor {
            let alt = &mut self.alts[id.0];
            if let Some(saved) = alt.frame.take() {
                return Some(saved);
            }
            cursor = alt.prev;
        }
        None
    }

    /// Prepares `frame` for resumption after a solution or a failed
    /// unification.
    ///
    /// Choice points already taken are unlinked from the stack first. Under
    /// [`Strategy::Interleaved`] the frame is then threaded outward: at each
    /// remaining choice point it is swapped with the alternative saved there,
    /// and whatever comes out of the outermost one is what runs next.
    pub fn delay(&mut self, frame: Option<Frame>, strategy: Strategy) -> Option<Frame> {
        let mut frame = frame?;
        frame.alt = self.prune(frame.alt);

        if strategy == Strategy::DepthFirst {
            return Some(frame);
        }

        let mut cursor = frame.alt;
        while let Some(id) = cursor {
            let Some(saved) = self.alts[id.0].frame.take() else {
                break;
            };
            self.alts[id.0].frame = Some(frame);
            frame = saved;

            let prev = self.prune(self.alts[id.0].prev);
            self.alts[id.0].prev = prev;
            cursor = prev;
        }

        Some(frame)
    }

    /// The first choice point at or below `cursor` that still holds an
    /// alternative.
    fn prune(&self, mut cursor: Option<AltId>) -> Option<AltId> {
        while let Some(id) = cursor {
            let alt = &self.alts[id.0];
            if alt.frame.is_some() {
                break;
            }
            cursor = alt.prev;
        }
        cursor
    }

    /// How many untried alternatives `frame` could still backtrack into.
    pub fn pending(&self, frame: &Frame) -> usize {
        let mut count = 0;
        let mut cursor = frame.alt;
        while let Some(id) = cursor {
            let alt = &self.alts[id.0];
            count += usize::from(alt.frame.is_some());
            cursor = alt.prev;
        }
        count
    }

    /// Sweeps once enough choice points have piled up since the last sweep.
    /// `root` must be the only frame outside the arena still in use.
    pub fn reclaim(&mut self, root: Option<&Frame>) {
        if self.live() >= 2 * self.survivors + SWEEP_SLACK {
            self.sweep(root);
        }
    }

    /// Frees every choice point that neither `root` nor a frame saved in a
    /// reachable choice point links to.
    fn sweep(&mut self, root: Option<&Frame>) {
        let before = self.live();

        let mut marked = vec![false; self.alts.len()];
        let mut todo = root.and_then(|frame| frame.alt).into_iter().collect::<Vec<_>>();
        while let Some(id) = todo.pop() {
            if mem::replace(&mut marked[id.0], true) {
                continue;
            }
            let alt = &self.alts[id.0];
            todo.extend(alt.prev);
            todo.extend(alt.frame.as_ref().and_then(|frame| frame.alt));
        }

        let keep = marked.iter().rposition(|&m| m).map_or(0, |i| i + 1);
        self.alts.truncate(keep);
        self.free.clear();
        for (i, alt) in self.alts.iter_mut().enumerate() {
            if !marked[i] {
                *alt = Alt::default();
                self.free.push(i);
            }
        }

        self.survivors = self.live();
        debug!(before, after = self.survivors, "swept choice points");
    }

    /// Choice points currently held in the arena, taken or not.
    pub fn live(&self) -> usize {
        self.alts.len() - self.free.len()
    }

    /// Choice points pushed over the stream's whole life.
    pub fn pushed(&self) -> usize {
        self.pushed
    }
}
