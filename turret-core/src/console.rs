//! Operator console grammar.
//!
//! One command per line. Keywords are case-insensitive:
//!
//! ```text
//! start | home | abort | status | help
//! target <degrees>
//! run <milliseconds>
//! ```

use core::fmt;

use winnow::ascii::{Caseless, dec_uint, float, space1};
use winnow::combinator::{alt, preceded};
use winnow::error::ContextError;
use winnow::prelude::*;

use crate::turret::Inputs;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    Start,
    Home,
    Abort,
    Status,
    Help,
    /// Move the simulated target to an absolute yaw angle.
    Target(f32),
    /// Advance simulated time.
    Run(u32),
}

impl Command {
    /// The operator inputs this command pulses for one cycle, if any.
    #[must_use]
    pub fn inputs(self) -> Option<Inputs> {
        let mut inputs = Inputs::default();
        match self {
            Command::Start => inputs.start = true,
            Command::Home => inputs.home = true,
            Command::Abort => inputs.abort = true,
            _ => return None,
        }
        Some(inputs)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConsoleError {
    Empty,
    Syntax,
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Empty => f.write_str("empty command"),
            ConsoleError::Syntax => f.write_str("unrecognised command; try `help`"),
        }
    }
}

/// Short help text listing every command.
pub const HELP: &str = "\
start          begin a duel
home           drive yaw into its stop and zero the encoder
abort          stop engaging and return home
status         print state, registers and task stats
target <deg>   move the simulated target
run <ms>       advance simulated time
help           show this text";

/// Parses one console line.
///
/// # Errors
///
/// Returns [`ConsoleError::Empty`] for blank lines and
/// [`ConsoleError::Syntax`] for anything unrecognised.
pub fn parse(line: &str) -> Result<Command, ConsoleError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(ConsoleError::Empty);
    }
    command().parse(line).map_err(|_| ConsoleError::Syntax)
}

fn command<'a>() -> impl Parser<&'a str, Command, ContextError> {
    move |input: &mut &'a str| {
        alt((
            preceded((Caseless("target"), space1), float).map(Command::Target),
            preceded((Caseless("run"), space1), dec_uint).map(Command::Run),
            Caseless("start").value(Command::Start),
            Caseless("home").value(Command::Home),
            Caseless("abort").value(Command::Abort),
            Caseless("status").value(Command::Status),
            Caseless("help").value(Command::Help),
        ))
        .parse_next(input)
    }
}
