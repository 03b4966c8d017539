use std::fmt;

use lasso::{Spur, ThreadedRodeo};
use lazy_static::lazy_static;

lazy_static! {
    static ref INTERNER: ThreadedRodeo = ThreadedRodeo::default();
}

/// An interned string.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash)]
pub struct IStr(Spur);

impl fmt::Debug for IStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sym({})", self.to_str())
    }
}

impl fmt::Display for IStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl<S> From<S> for IStr
where
    S: AsRef<str>,
{
    fn from(s: S) -> Self {
        IStr(INTERNER.get_or_intern(s.as_ref()))
    }
}

impl IStr {
    pub fn to_str(&self) -> &'static str {
        INTERNER.resolve(&self.0)
    }
}

#[test]
fn interning_is_idempotent() {
    let a = IStr::from("cons");
    let b = IStr::from(String::from("cons"));
    assert2::check!(a == b);
    assert2::check!(a.to_str() == "cons");
    assert2::check!(IStr::from("nil") != a);
}
