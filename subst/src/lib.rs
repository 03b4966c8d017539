use std::{fmt, hash::Hash};

use rpds::HashTrieMap;


pub enum TermKind<Var> {
    Var(Var),
    NonVar,
}

pub trait ClassifyTerm<Var> {
    fn classify_term(&self) -> TermKind<&Var>;

    /// Two non-variable terms are superficially unifiable when their outermost layer
    /// agrees: same functor *and* same number of direct children, or (for atomic
    /// values) equal values. Children are not inspected.
    fn superficially_unifiable(&self, other: &Self) -> bool;

    fn is_var(&self) -> bool {
        matches!(self.classify_term(), TermKind::Var(_))
    }

    fn is_non_var(&self) -> bool {
        matches!(self.classify_term(), TermKind::NonVar)
    }
}

pub trait DirectChildren<Var>: Sized {
    /// All *direct* children (and *only* the *direct* children) of `Self` which are of
    /// type `Self` should be yielded.
    fn direct_children<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Self> + 'a>;

    /// Given a function, you need to create a new `Self` where your *direct* children
    /// have been replaced with the ones provided by the function.
    fn map_direct_children(&self, f: impl FnMut(&Self) -> Self) -> Self;
}

/// Hook run by [`Subst::deep_walk`] after a non-variable term has had its children
/// dereferenced. Returning `Some` replaces the term (e.g. `+(1, 2)` becomes `3`).
pub trait Collapse: Sized {
    fn collapse(&self) -> Option<Self> {
        None
    }
}

/// An immutable mapping from variables to terms.
///
/// Bindings are triangular: a variable may be bound to a term that mentions other
/// bound variables, so lookups go through [`Subst::walk`]. Cloning is O(1) and
/// every derived substitution shares structure with the one it came from.
pub struct Subst<Var, Term>
where
    Var: Eq + Hash,
{
    map: HashTrieMap<Var, Term>,
}

impl<Var, Term> Clone for Subst<Var, Term>
where
    Var: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
        }
    }
}

impl<Var, Term> Default for Subst<Var, Term>
where
    Var: Eq + Hash,
{
    fn default() -> Self {
        HashTrieMap::new().into()
    }
}

impl<Var, Term> fmt::Debug for Subst<Var, Term>
where
    Var: Eq + Hash + fmt::Debug,
    Term: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.map.iter()).finish()
    }
}

impl<Var, Term> From<HashTrieMap<Var, Term>> for Subst<Var, Term>
where
    Var: Eq + Hash,
{
    fn from(map: HashTrieMap<Var, Term>) -> Self {
        Self { map }
    }
}

/// The result of a successful [`Subst::unify`].
#[derive(Debug)]
pub struct Unified<Var, Term>
where
    Var: Eq + Hash,
{
    pub subst: Subst<Var, Term>,
    /// Every variable bound by the unification, in the order it was bound.
    pub bindings: Vec<(Var, Term)>,
}

impl<Var, Term> Subst<Var, Term>
where
    Var: Clone + Eq + Hash,
    Term: Clone + ClassifyTerm<Var> + DirectChildren<Var>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn get(&self, var: &Var) -> Option<&Term> {
        self.map.get(var)
    }

    pub fn is_bound(&self, var: &Var) -> bool {
        self.map.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Var, &Term)> {
        self.map.iter()
    }

    /// Follows variable chains until reaching either an unbound variable or a
    /// non-variable term. Children are left alone.
    pub fn walk(&self, term: &Term) -> Term {
        let mut current = term.clone();
        loop {
            let next = match current.classify_term() {
                TermKind::Var(var) => self.map.get(var).cloned(),
                TermKind::NonVar => None,
            };
            match next {
                Some(next) => current = next,
                None => return current,
            }
        }
    }

    /// Like [`Subst::walk`], but also dereferences inside compound terms, giving the
    /// term's [`Collapse`] hook a chance to run on the way back up.
    pub fn deep_walk(&self, term: &Term) -> Term
    where
        Term: Collapse,
    {
        let term = self.walk(term);
        if term.is_var() {
            return term;
        }
        let walked = term.map_direct_children(|child| self.deep_walk(child));
        walked.collapse().unwrap_or(walked)
    }

    /// Does `var` appear anywhere inside `term` once bindings are followed?
    pub fn occurs(&self, var: &Var, term: &Term) -> bool {
        let term = self.walk(term);
        match term.classify_term() {
            TermKind::Var(other) => other == var,
            TermKind::NonVar => term.direct_children().any(|child| self.occurs(var, child)),
        }
    }

    /// The unbound variables reachable from `term`, left to right, without repeats.
    pub fn occurrences(&self, term: &Term) -> Vec<Var> {
        let mut found = Vec::new();
        self.collect_occurrences(term, &mut found);
        found
    }

    fn collect_occurrences(&self, term: &Term, found: &mut Vec<Var>) {
        let term = self.walk(term);
        match term.classify_term() {
            TermKind::Var(var) => {
                if !found.contains(var) {
                    found.push(var.clone());
                }
            }
            TermKind::NonVar => {
                for child in term.direct_children() {
                    self.collect_occurrences(child, found);
                }
            }
        }
    }

    /// Starts a batch of provisional bindings on top of `self`.
    pub fn mutate(&self) -> Mutor<Var, Term> {
        Mutor {
            subst: self.clone(),
            bindings: Vec::new(),
        }
    }

    /// Unifies `x` and `y`. Either every binding is kept or none are: on failure
    /// `self` is untouched and `None` is returned.
    pub fn unify(&self, x: &Term, y: &Term) -> Option<Unified<Var, Term>> {
        let mut mutor = self.mutate();
        if mutor.unify(x, y) {
            Some(mutor.finish())
        } else {
            None
        }
    }
}

/// Scratch space for a unification in progress.
///
/// Bindings land in a private copy-on-write copy of the substitution, so dropping
/// a `Mutor` discards them all at once.
pub struct Mutor<Var, Term>
where
    Var: Eq + Hash,
{
    subst: Subst<Var, Term>,
    bindings: Vec<(Var, Term)>,
}

impl<Var, Term> Mutor<Var, Term>
where
    Var: Clone + Eq + Hash,
    Term: Clone + ClassifyTerm<Var> + DirectChildren<Var>,
{
    pub fn unify(&mut self, x: &Term, y: &Term) -> bool {
        use TermKind::*;

        // Re-walk both sides so bindings made earlier in this batch are honored.
        let x = self.subst.walk(x);
        let y = self.subst.walk(y);

        match (x.classify_term(), y.classify_term()) {
            (Var(a), Var(b)) if a == b => true,
            (Var(a), _) => self.bind(a.clone(), y.clone()),
            (NonVar, Var(b)) => self.bind(b.clone(), x.clone()),
            (NonVar, NonVar) => {
                if !x.superficially_unifiable(&y) {
                    return false;
                }
                x.direct_children()
                    .zip(y.direct_children())
                    .all(|(a, b)| self.unify(a, b))
            }
        }
    }

    fn bind(&mut self, var: Var, value: Term) -> bool {
        if self.subst.occurs(&var, &value) {
            return false;
        }
        self.subst.map.insert_mut(var.clone(), value.clone());
        self.bindings.push((var, value));
        true
    }

    pub fn bindings(&self) -> &[(Var, Term)] {
        &self.bindings
    }

    pub fn finish(self) -> Unified<Var, Term> {
        Unified {
            subst: self.subst,
            bindings: self.bindings,
        }
    }
}
