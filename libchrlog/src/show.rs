//! Rendering terms and constraints for people.

use std::{collections::BTreeMap, fmt};

use crate::{
    chr::Cid,
    data_structures::{Subst, Var},
    tm::{RcTm, Tm},
};

/// Writes `tm` as it stands, naming variables with `name_var`.
pub(crate) fn write_tm(
    w: &mut impl fmt::Write,
    tm: &RcTm,
    name_var: &mut impl FnMut(Var) -> String,
) -> fmt::Result {
    match tm.as_ref() {
        Tm::Var(var) => w.write_str(&name_var(*var)),
        Tm::Int(i) => write!(w, "{i}"),
        Tm::Txt(s) => write!(w, "{s:?}"),
        Tm::Compound(functor, args) if args.is_empty() => write!(w, "{functor}"),
        Tm::Compound(functor, args) => {
            write!(w, "{functor}(")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    w.write_str(", ")?;
                }
                write_tm(w, arg, name_var)?;
            }
            w.write_str(")")
        }
    }
}

/// Shows terms as they stand under one substitution.
///
/// Variables keep the names they were given up front. Any other unbound variable
/// is called `V<n>` the first time it's mentioned, where `n` counts the names
/// handed out so far, and keeps that name for the lifetime of the `Show`.
#[derive(Debug, Clone)]
pub struct Show<'s> {
    subs: &'s Subst,
    names: BTreeMap<Var, String>,
}

impl<'s> Show<'s> {
    pub fn new(subs: &'s Subst) -> Self {
        Self {
            subs,
            names: BTreeMap::new(),
        }
    }

    pub fn with_names<S: Into<String>>(
        subs: &'s Subst,
        names: impl IntoIterator<Item = (Var, S)>,
    ) -> Self {
        Self {
            subs,
            names: names.into_iter().map(|(v, s)| (v, s.into())).collect(),
        }
    }

    fn name_of(names: &mut BTreeMap<Var, String>, var: Var) -> String {
        let next = format!("V{}", names.len());
        names.entry(var).or_insert(next).clone()
    }

    /// Builtin compounds whose arguments have since become ground are shown
    /// evaluated.
    pub fn tm(&mut self, tm: &RcTm) -> String {
        let tm = self.subs.deep_walk(tm);
        let names = &mut self.names;
        let mut out = String::new();
        // Writing into a `String` can't fail.
        let _ = write_tm(&mut out, &tm, &mut |var| Self::name_of(names, var));
        out
    }

    pub fn cid(&mut self, cid: &Cid) -> String {
        let args = cid
            .args()
            .iter()
            .map(|arg| self.tm(arg))
            .collect::<Vec<_>>()
            .join(", ");
        if args.is_empty() {
            format!("{}", cid.sig().name)
        } else {
            format!("{}({args})", cid.sig().name)
        }
    }
}
