use std::fmt;

use libchrlog::rt::{self, breakpoint::Event};

pub type AppRes<T> = Result<T, AppErr>;

#[derive(Debug)]
pub enum AppErr {
    UnknownFlag(String),
    MissingValue {
        flag: &'static str,
    },
    BadValue {
        flag: &'static str,
        value: String,
    },
    UnknownEvent(String),
    RtError(rt::Err),
}

impl From<rt::Err> for AppErr {
    fn from(e: rt::Err) -> Self {
        Self::RtError(e)
    }
}

impl fmt::Display for AppErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppErr::UnknownFlag(flag) => write!(f, "Unknown flag `{flag}`."),
            AppErr::MissingValue { flag } => write!(f, "The flag `{flag}` needs a value."),
            AppErr::BadValue { flag, value } => {
                write!(f, "`{value}` is not a valid value for `{flag}`.")
            }
            AppErr::UnknownEvent(name) => {
                write!(f, "Unknown debugger event `{name}`. Valid events are:")?;
                for event in Event::ALL {
                    write!(f, "\n  - {event}")?;
                }
                Ok(())
            }
            AppErr::RtError(e) => write!(f, "An error occurred during runtime:\n{e}"),
        }
    }
}
