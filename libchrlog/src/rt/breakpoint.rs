use core::fmt;
use std::str::FromStr;

use super::Frame;

/// Observes a running stream. Called synchronously; the frame passed in is the
/// state right after the event happened.
pub trait Breakpoint {
    fn breakpoint(&mut self, event: Event, frame: &Frame);
}

/// See [Byrd Box Model](https://www.swi-prolog.org/pldoc/man?section=byrd-box-model)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Event {
    /// A predicate was entered.
    Call,
    /// A `Success` returned to its caller or completed the query.
    Exit,
    /// Execution resumed from a choice point.
    Redo,
    /// The current branch failed.
    Fail,
    /// A program error ended the stream.
    Exception,
    /// A unification succeeded and its bindings were committed.
    Unify,
    /// A CHR rule fired and its body was scheduled.
    Fire,
}

impl Event {
    pub const ALL: [Event; 7] = [
        Event::Call,
        Event::Exit,
        Event::Redo,
        Event::Fail,
        Event::Exception,
        Event::Unify,
        Event::Fire,
    ];
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Event::Call => "call",
                Event::Exit => "exit",
                Event::Redo => "redo",
                Event::Fail => "fail",
                Event::Exception => "exception",
                Event::Unify => "unify",
                Event::Fire => "fire",
            }
        )
    }
}

impl FromStr for Event {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "call" => Ok(Event::Call),
            "exit" => Ok(Event::Exit),
            "redo" => Ok(Event::Redo),
            "fail" => Ok(Event::Fail),
            "exception" => Ok(Event::Exception),
            "unify" => Ok(Event::Unify),
            "fire" => Ok(Event::Fire),
            _ => Err(()),
        }
    }
}

#[test]
fn event_names_round_trip() {
    for event in Event::ALL {
        assert2::check!(event.to_string().parse::<Event>() == Ok(event));
    }
    assert2::check!("Call".parse::<Event>().is_err());
}
