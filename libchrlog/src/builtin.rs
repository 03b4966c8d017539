//! Built-in evaluable functors.

use std::fmt;

use num::Zero;

use crate::tm::{RcTm, Tm};

/// A functor that carries an evaluator. Once every argument of a compound built
/// from one of these is ground, the compound is replaced by its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Builtin {
    pub fn symbol(&self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Rem => "%",
        }
    }

    pub fn from_symbol(s: &str) -> Option<Self> {
        Some(match s {
            "+" => Builtin::Add,
            "-" => Builtin::Sub,
            "*" => Builtin::Mul,
            "/" => Builtin::Div,
            "%" => Builtin::Rem,
            _ => return None,
        })
    }

    /// Evaluates over ground arguments. `None` means the operands don't make sense
    /// for this functor (wrong count or kind, division by zero) and the compound
    /// stays as it is.
    pub fn eval(&self, args: &[RcTm]) -> Option<RcTm> {
        let [x, y] = args else {
            return None;
        };

        match (self, x.as_ref(), y.as_ref()) {
            (Builtin::Add, Tm::Txt(a), Tm::Txt(b)) => Some(Tm::Txt(format!("{a}{b}")).into()),
            (_, Tm::Int(a), Tm::Int(b)) => {
                let value = match self {
                    Builtin::Add => a + b,
                    Builtin::Sub => a - b,
                    Builtin::Mul => a * b,
                    Builtin::Div if b.is_zero() => return None,
                    Builtin::Div => a / b,
                    Builtin::Rem if b.is_zero() => return None,
                    Builtin::Rem => a % b,
                };
                Some(Tm::Int(value).into())
            }
            _ => None,
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
