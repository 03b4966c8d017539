use std::collections::BTreeSet;

use libchrlog::{
    rt::{
        breakpoint::{Breakpoint, Event},
        Frame,
    },
    show::Show,
};
use nu_ansi_term::Color;

use crate::app_err::{AppErr, AppRes};

/// Prints the events it watches for as the stream runs. Never pauses.
#[derive(Debug, Clone)]
pub struct Tracer {
    pub watch: BTreeSet<Event>,
}

impl Default for Tracer {
    fn default() -> Self {
        Self {
            watch: Event::ALL.into_iter().collect(),
        }
    }
}

impl Tracer {
    /// Parses a comma separated list of event names, or `all`.
    pub fn parse(names: &str) -> AppRes<Self> {
        if names.trim() == "all" {
            return Ok(Self::default());
        }

        let watch = names
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| {
                name.parse::<Event>()
                    .map_err(|()| AppErr::UnknownEvent(name.to_owned()))
            })
            .collect::<AppRes<_>>()?;

        Ok(Self { watch })
    }
}

fn color(event: Event) -> Color {
    match event {
        Event::Call => Color::Cyan,
        Event::Exit => Color::Green,
        Event::Redo => Color::Yellow,
        Event::Fail => Color::Red,
        Event::Exception => Color::LightRed,
        Event::Unify => Color::Blue,
        Event::Fire => Color::Purple,
    }
}

impl Breakpoint for Tracer {
    fn breakpoint(&mut self, event: Event, frame: &Frame) {
        if !self.watch.contains(&event) {
            return;
        }

        let cont = frame.cont();
        let mut show = Show::new(frame.subs());
        let env = cont
            .env()
            .iter()
            .map(|tm| show.tm(tm))
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "[[{}][depth {}][{}] {}]]",
            color(event).paint(format!("{event}")),
            cont.depth(),
            cont.origin(),
            Color::Yellow.paint(format!("[{env}]")),
        );

        if let Some(instr) = cont.current() {
            println!("  {} {instr}", Color::DarkGray.paint(format!("@{}", cont.pc())));
        }
    }
}
